//! Per-block orchestrator: metering, gain staging, oversampled wet path,
//! dry/wet blend
//!
//! The engine is the only component that touches the host-facing buffer.
//! Per block it meters the input, keeps a dry copy, ramps the input gain
//! on the wet path, upsamples both paths through identically configured
//! half-band filters, runs the compressor then the overdrive on the
//! oversampled wet path, downsamples, meters again, blends, and ramps the
//! output gain.
//!
//! All state and scratch buffers are sized at `prepare`; the block path
//! performs no allocation, locking, or blocking calls.

use std::sync::Arc;

use ow_core::{
    EngineError, EngineResult, ParamStore, PlanarBuffer, RawParams, Sample, db_to_gain,
};

use crate::dynamics::Compressor;
use crate::metering::{MeterBus, MeterSnapshot, peak, rms};
use crate::overdrive::{DRIVE_TIME_MS, Overdrive};
use crate::oversampling::{OS_FACTOR, Oversampler2x};
use crate::{ChannelState, MAX_CHANNELS};

/// Compressor/overdrive engine with oversampled processing.
pub struct OverwireEngine {
    sample_rate: f64,
    max_block: usize,
    channels: usize,
    latency: usize,
    prepared: bool,

    params: Arc<ParamStore>,
    meters: Arc<MeterBus>,

    compressor: Compressor,
    overdrive: Overdrive,
    state: [ChannelState; MAX_CHANNELS],

    wet_os: Vec<Oversampler2x>,
    dry_os: Vec<Oversampler2x>,

    dry_buf: PlanarBuffer,
    wet_os_buf: PlanarBuffer,
    dry_os_buf: PlanarBuffer,

    prev_in_gain: Sample,
    prev_out_gain: Sample,
}

impl OverwireEngine {
    pub fn new() -> Self {
        Self::with_params(RawParams::default())
    }

    pub fn with_params(initial: RawParams) -> Self {
        Self {
            sample_rate: 0.0,
            max_block: 0,
            channels: 0,
            latency: 0,
            prepared: false,
            params: Arc::new(ParamStore::new(initial)),
            meters: Arc::new(MeterBus::default()),
            compressor: Compressor::new(),
            overdrive: Overdrive::new(),
            state: [ChannelState::default(); MAX_CHANNELS],
            wet_os: Vec::new(),
            dry_os: Vec::new(),
            dry_buf: PlanarBuffer::new(0, 0),
            wet_os_buf: PlanarBuffer::new(0, 0),
            dry_os_buf: PlanarBuffer::new(0, 0),
            prev_in_gain: 0.0,
            prev_out_gain: 0.0,
        }
    }

    /// Capability query, answered before `prepare` is ever attempted.
    pub fn supports_channel_count(channel_count: usize) -> bool {
        (1..=MAX_CHANNELS).contains(&channel_count)
    }

    /// (Re)allocate per-channel state, scratch buffers, and anti-aliasing
    /// filters. Returns the fixed processing latency in samples; the value
    /// does not change until the next `prepare`.
    pub fn prepare(
        &mut self,
        sample_rate: f64,
        max_block_size: usize,
        channel_count: usize,
    ) -> EngineResult<usize> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(EngineError::InvalidSampleRate(sample_rate));
        }
        if max_block_size == 0 {
            return Err(EngineError::InvalidBlockSize(max_block_size));
        }
        if !Self::supports_channel_count(channel_count) {
            return Err(EngineError::UnsupportedChannelCount(channel_count));
        }

        self.prepared = false;

        self.wet_os.clear();
        self.dry_os.clear();
        for _ in 0..channel_count {
            self.wet_os.push(Oversampler2x::new()?);
            self.dry_os.push(Oversampler2x::new()?);
        }
        self.latency = self.wet_os[0].latency();

        self.dry_buf = PlanarBuffer::new(channel_count, max_block_size);
        self.wet_os_buf = PlanarBuffer::new(channel_count, max_block_size * OS_FACTOR);
        self.dry_os_buf = PlanarBuffer::new(channel_count, max_block_size * OS_FACTOR);

        self.sample_rate = sample_rate;
        self.max_block = max_block_size;
        self.channels = channel_count;

        let sr = sample_rate as Sample;
        self.overdrive.set_drive_time(DRIVE_TIME_MS * sr * 0.001);
        let p = self.params.load();
        self.refresh_effective_params(&p);

        for state in &mut self.state {
            state.reset();
        }
        self.meters.clear();
        self.prev_in_gain = 0.0;
        self.prev_out_gain = 0.0;
        self.prepared = true;

        log::info!(
            "engine prepared: {sample_rate} Hz, {channel_count} ch, max block {max_block_size}, latency {} samples",
            self.latency
        );
        Ok(self.latency)
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub fn latency(&self) -> usize {
        self.latency
    }

    pub fn channel_count(&self) -> usize {
        self.channels
    }

    /// Shared handle for the UI thread to write parameters through.
    pub fn params(&self) -> Arc<ParamStore> {
        Arc::clone(&self.params)
    }

    /// Shared handle for the UI thread to poll meters from.
    pub fn meters(&self) -> Arc<MeterBus> {
        Arc::clone(&self.meters)
    }

    /// Publish a full raw parameter set (clamped, never rejected).
    /// Intended to be called at most once per block.
    pub fn update_params(&self, raw: RawParams) {
        self.params.store(raw);
    }

    /// Non-blocking copy of the current per-channel meter values.
    pub fn meter_snapshot(&self) -> [MeterSnapshot; MAX_CHANNELS] {
        let mut out = [MeterSnapshot::default(); MAX_CHANNELS];
        for (ch, slot) in out.iter_mut().enumerate() {
            *slot = self.meters.channel(ch).snapshot();
        }
        out
    }

    /// Clear all envelope and filter state without reallocating.
    pub fn reset(&mut self) {
        for state in &mut self.state {
            state.reset();
        }
        for os in self.wet_os.iter_mut().chain(self.dry_os.iter_mut()) {
            os.reset();
        }
        self.meters.clear();
        self.prev_in_gain = 0.0;
        self.prev_out_gain = 0.0;
    }

    /// In-place per-block transform. Real-time safe; a no-op until
    /// `prepare` has succeeded.
    pub fn process(&mut self, buffer: &mut [&mut [Sample]], num_samples: usize) {
        if !self.prepared || buffer.is_empty() || num_samples == 0 {
            return;
        }
        debug_assert_eq!(buffer.len(), self.channels);
        debug_assert!(num_samples <= self.max_block);

        let channels = self.channels.min(buffer.len());
        let n = num_samples.min(self.max_block);
        let os_len = n * OS_FACTOR;

        // Latest parameter values, read once per block.
        let p = self.params.load();

        // Input metering.
        for ch in 0..channels {
            let lane = &buffer[ch][..n];
            self.meters.channel(ch).publish_pre(rms(lane), peak(lane));
        }

        // Dry copy, taken before any gain staging.
        for ch in 0..channels {
            self.dry_buf.lane_mut(ch, n).copy_from_slice(&buffer[ch][..n]);
        }

        // Ramped input gain, wet path only.
        let in_gain = db_to_gain(p.input_gain_db);
        for ch in 0..channels {
            apply_gain_ramp(&mut buffer[ch][..n], self.prev_in_gain, in_gain);
        }
        self.prev_in_gain = in_gain;

        for ch in 0..channels {
            self.meters.channel(ch).publish_pre_comp(rms(&buffer[ch][..n]));
        }

        // Upsample both paths through identically configured filters so
        // their relative group delay is zero.
        for ch in 0..channels {
            self.wet_os[ch].upsample_block(&buffer[ch][..n], self.wet_os_buf.lane_mut(ch, os_len));
            self.dry_os[ch]
                .upsample_block(self.dry_buf.lane(ch, n), self.dry_os_buf.lane_mut(ch, os_len));
        }

        self.refresh_effective_params(&p);

        // Compressor, then overdrive, on the oversampled wet path only.
        for ch in 0..channels {
            self.compressor
                .process_block(self.wet_os_buf.lane_mut(ch, os_len), &mut self.state[ch]);
        }
        for ch in 0..channels {
            self.overdrive
                .process_block(self.wet_os_buf.lane_mut(ch, os_len), &mut self.state[ch]);
        }

        // Back to the base rate.
        for ch in 0..channels {
            self.wet_os[ch].downsample_block(self.wet_os_buf.lane(ch, os_len), &mut buffer[ch][..n]);
        }
        for ch in 0..channels {
            self.dry_os[ch]
                .downsample_block(self.dry_os_buf.lane(ch, os_len), self.dry_buf.lane_mut(ch, n));
        }

        // Processed-path metering, before the blend.
        for ch in 0..channels {
            let lane = &buffer[ch][..n];
            self.meters.channel(ch).publish_post(rms(lane), peak(lane));
        }

        // Dry/wet blend.
        let scaled_mix = p.mix.clamp(0.0, 100.0) * 0.01;
        for ch in 0..channels {
            let dry = self.dry_buf.lane(ch, n);
            for (sample, &d) in buffer[ch][..n].iter_mut().zip(dry) {
                *sample = *sample * scaled_mix + d * (1.0 - scaled_mix);
            }
        }

        // Ramped output gain.
        let out_gain = db_to_gain(p.output_gain_db);
        for ch in 0..channels {
            apply_gain_ramp(&mut buffer[ch][..n], self.prev_out_gain, out_gain);
        }
        self.prev_out_gain = out_gain;
    }

    /// Recompute effective engine parameters from one raw snapshot, the
    /// same one the block's blend and gain staging use. The raw 0-100
    /// ratio control maps onto [1, 2] for both the compressor ratio and
    /// the overdrive dry/wet blend.
    fn refresh_effective_params(&mut self, p: &RawParams) {
        let ratio = 1.0 + p.ratio * 0.01;
        let sr = self.sample_rate as Sample;
        self.compressor.set_params(
            ratio,
            p.threshold_db,
            p.attack_ms * sr * 0.001,
            p.release_ms * sr * 0.001,
        );
        self.overdrive.set_ratio(ratio);
    }
}

impl Default for OverwireEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Linear gain ramp across a block, matching the previous block's end
/// gain at the first sample to avoid clicks.
#[inline]
fn apply_gain_ramp(buffer: &mut [Sample], start: Sample, end: Sample) {
    let increment = (end - start) / buffer.len() as Sample;
    let mut gain = start;
    for sample in buffer.iter_mut() {
        *sample *= gain;
        gain += increment;
    }
}
