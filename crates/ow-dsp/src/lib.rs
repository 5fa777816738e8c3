//! ow-dsp: Signal-processing core of the Overwire compressor/overdrive
//!
//! ## Modules
//! - `smoothing` - one-pole ramp primitive used by all envelope tracking
//! - `dynamics` - soft-knee gain computer and compressor engine
//! - `overdrive` - drive-envelope tracker and harmonic saturation waveshaper
//! - `oversampling` - 2x half-band FIR up/down sampler
//! - `metering` - per-channel RMS/peak snapshots for the UI thread
//! - `engine` - per-block orchestrator (gain staging, oversampled wet path,
//!   dry/wet blend)

pub mod dynamics;
pub mod engine;
pub mod metering;
pub mod overdrive;
pub mod oversampling;
pub mod smoothing;

use ow_core::Sample;

/// Compile-time channel bound. Mono and stereo layouts are supported.
pub const MAX_CHANNELS: usize = 2;

/// Per-channel mutable envelope state, threaded explicitly through the
/// compressor and overdrive engines. Persists across blocks; cleared only
/// by a full re-prepare.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelState {
    /// Compressor gain-reduction envelope, (0, 1] once settled
    pub envelope: Sample,
    pub prev_envelope: Sample,
    /// Fast envelope of rectified input magnitude
    pub drive_env: Sample,
    pub prev_drive_env: Sample,
    /// Slow saturation-amount envelope, clamped to [0, 1]
    pub drive: Sample,
    pub prev_drive: Sample,
}

impl ChannelState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
