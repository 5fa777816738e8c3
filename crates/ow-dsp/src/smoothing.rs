//! One-pole ramp primitive
//!
//! `y(n) = y(n-1) + (x(n) - y(n-1)) / steps` - a discrete one-pole
//! low-pass. Its step response reaches `1 - (1 - 1/steps)^n` of the target
//! after `n` applications and never overshoots for `steps >= 1`.

use ow_core::Sample;

/// Speed multiplier applied to every envelope ramp in the engine.
pub const ENV_SPEED_FACTOR: Sample = 1.1;

/// Advance `previous` one step toward `target`. Caller guarantees
/// `steps > 0`.
#[inline]
pub fn smooth(target: Sample, previous: Sample, steps: Sample) -> Sample {
    previous + (target - previous) / steps
}

/// Like [`smooth`], with the time constant scaled by `speed_factor`.
#[inline]
pub fn smooth_scaled(
    target: Sample,
    previous: Sample,
    steps: Sample,
    speed_factor: Sample,
) -> Sample {
    previous + (target - previous) / (steps * speed_factor)
}
