//! Per-channel level metering
//!
//! The audio thread overwrites one snapshot per channel per block; the UI
//! thread polls whenever it repaints. Single writer, single reader, no
//! ordering guarantee beyond "reads see some recently-published block".

use ow_core::{AtomicF32, Sample};

use crate::MAX_CHANNELS;

/// RMS level of a block.
pub fn rms(samples: &[Sample]) -> Sample {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|&s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// Peak magnitude of a block.
pub fn peak(samples: &[Sample]) -> Sample {
    samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()))
}

/// Plain-value copy of one channel's meters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterSnapshot {
    /// RMS before any processing
    pub pre_rms: Sample,
    /// Peak before any processing
    pub pre_peak: Sample,
    /// RMS after input gain, before compression
    pub pre_comp_rms: Sample,
    /// RMS after the processed path, before the dry/wet blend
    pub post_rms: Sample,
    /// Peak after the processed path, before the dry/wet blend
    pub post_peak: Sample,
}

/// One channel's atomic meter cells.
#[derive(Debug, Default)]
pub struct ChannelMeters {
    pre_rms: AtomicF32,
    pre_peak: AtomicF32,
    pre_comp_rms: AtomicF32,
    post_rms: AtomicF32,
    post_peak: AtomicF32,
}

impl ChannelMeters {
    pub fn publish_pre(&self, rms: Sample, peak: Sample) {
        self.pre_rms.set(rms);
        self.pre_peak.set(peak);
    }

    pub fn publish_pre_comp(&self, rms: Sample) {
        self.pre_comp_rms.set(rms);
    }

    pub fn publish_post(&self, rms: Sample, peak: Sample) {
        self.post_rms.set(rms);
        self.post_peak.set(peak);
    }

    pub fn snapshot(&self) -> MeterSnapshot {
        MeterSnapshot {
            pre_rms: self.pre_rms.get(),
            pre_peak: self.pre_peak.get(),
            pre_comp_rms: self.pre_comp_rms.get(),
            post_rms: self.post_rms.get(),
            post_peak: self.post_peak.get(),
        }
    }

    pub fn clear(&self) {
        self.pre_rms.set(0.0);
        self.pre_peak.set(0.0);
        self.pre_comp_rms.set(0.0);
        self.post_rms.set(0.0);
        self.post_peak.set(0.0);
    }
}

/// Fixed-capacity meter bank shared with the UI thread.
#[derive(Debug, Default)]
pub struct MeterBus {
    channels: [ChannelMeters; MAX_CHANNELS],
}

impl MeterBus {
    pub fn channel(&self, index: usize) -> &ChannelMeters {
        &self.channels[index]
    }

    pub fn clear(&self) {
        for ch in &self.channels {
            ch.clear();
        }
    }
}
