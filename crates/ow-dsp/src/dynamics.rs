//! Soft-knee gain computer and compressor engine
//!
//! The gain computer is a stateless mapping from instantaneous level to a
//! linear attenuation factor; the compressor engine drives it through
//! attack/release envelope smoothing, independently per channel.

use ow_core::{Sample, db_to_gain, gain_to_db};

use crate::ChannelState;
use crate::smoothing::{ENV_SPEED_FACTOR, smooth_scaled};

/// Soft-knee width in dB.
pub const KNEE_DB: Sample = 5.0;

/// Linear attenuation factor in (0, 1] for a signal level in dB.
///
/// Below the knee (signal well under threshold) the factor approaches 1;
/// at and above threshold the knee transitions smoothly into full-ratio
/// compression. `ratio` must be >= 1; ratio = 1 yields 1 (pure bypass).
#[inline]
pub fn attenuation(
    ratio: Sample,
    threshold_db: Sample,
    signal_db: Sample,
    knee_db: Sample,
) -> Sample {
    let over = threshold_db - signal_db;
    let knee_factor = 1.0 - over.clamp(0.0, knee_db) / knee_db;
    1.0 + knee_factor * -(1.0 - db_to_gain(over * (1.0 - 1.0 / ratio)))
}

/// Per-channel feed-forward compressor.
///
/// Effective parameters are pushed once per block by the orchestrator;
/// attack/release time constants are expressed in samples of the base
/// rate even though processing runs on the oversampled block.
#[derive(Debug, Clone)]
pub struct Compressor {
    ratio: Sample,
    threshold_db: Sample,
    attack_samples: Sample,
    release_samples: Sample,
}

impl Compressor {
    pub fn new() -> Self {
        Self {
            ratio: 2.0,
            threshold_db: -12.0,
            attack_samples: 1.0,
            release_samples: 1.0,
        }
    }

    /// Update effective parameters. Time constants are forced strictly
    /// positive to honor the smoother's domain precondition.
    pub fn set_params(
        &mut self,
        ratio: Sample,
        threshold_db: Sample,
        attack_samples: Sample,
        release_samples: Sample,
    ) {
        self.ratio = ratio.max(1.0);
        self.threshold_db = threshold_db;
        self.attack_samples = attack_samples.max(Sample::MIN_POSITIVE);
        self.release_samples = release_samples.max(Sample::MIN_POSITIVE);
    }

    /// Process one channel in place. No cross-channel coupling.
    pub fn process_block(&self, buffer: &mut [Sample], state: &mut ChannelState) {
        for sample in buffer.iter_mut() {
            let signal_db = gain_to_db(sample.abs());
            let raw = attenuation(self.ratio, self.threshold_db, signal_db, KNEE_DB);

            // Rising attenuation means the signal is decaying: release.
            state.envelope = if raw > state.prev_envelope {
                smooth_scaled(raw, state.prev_envelope, self.release_samples, ENV_SPEED_FACTOR)
            } else {
                smooth_scaled(raw, state.prev_envelope, self.attack_samples, ENV_SPEED_FACTOR)
            };
            state.prev_envelope = state.envelope;

            *sample *= state.envelope;
        }
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}
