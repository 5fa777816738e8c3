//! Drive-envelope tracker and harmonic saturation waveshaper
//!
//! Runs on the oversampled signal. Positive samples go through a two-stage
//! drive envelope, a cascaded rational sigmoid, a piecewise clipper, and a
//! 1/0.9 makeup gain; negative samples are rectified, clipped, and
//! re-negated without the envelope/sigmoid stages or the makeup gain. The
//! asymmetry is intentional and preserved.
//! The ratio control doubles as the dry/wet blend: 1 is pure dry, 2 is
//! pure wet.

use ow_core::Sample;

use crate::ChannelState;
use crate::smoothing::{ENV_SPEED_FACTOR, smooth, smooth_scaled};

/// Time constant of the drive envelopes, fixed and not user-exposed.
pub const DRIVE_TIME_MS: Sample = 1100.0;

/// Scale applied to the drive time for the fast magnitude envelope.
const DRIVE_ENV_SCALE: Sample = 0.015;

/// Drive-envelope level below which the fast time constant is selected.
const CLIP_THRESHOLD: Sample = 0.5;

/// Piecewise clipper breakpoints and shape constants.
const KNEE_LO: Sample = 0.647;
const KNEE_HI: Sample = 1.192;
const CEILING: Sample = 0.9144;

/// Makeup gain after the clipper, applied on the positive branch only.
const CLIP_MAKEUP: Sample = 1.0 / 0.9;

/// Three-region clipper: pass-through below `KNEE_LO`, a polynomial bend
/// up to `KNEE_HI`, a hard ceiling above.
#[inline]
fn clip_regions(x: Sample) -> Sample {
    if x < KNEE_LO {
        x
    } else if x < KNEE_HI {
        0.9 * (x - 0.1841) * (2.2 - x)
    } else {
        CEILING
    }
}

/// Cascaded rational sigmoid synthesizing the harmonic content.
#[inline]
fn sigmoid_cascade(x: Sample, drive: Sample) -> Sample {
    let y = x * ((27.0 + (9.0 - 8.2 * drive) * x * x * 0.8) / (27.0 + 9.0 * x * x));
    let y = y * ((27.0 + 0.8 * y * y) / (27.0 + 9.0 * y * y));
    y * 0.9
}

/// Per-channel overdrive stage.
#[derive(Debug, Clone)]
pub struct Overdrive {
    ratio: Sample,
    drive_time: Sample,
}

impl Overdrive {
    pub fn new() -> Self {
        Self {
            ratio: 2.0,
            drive_time: 1.0,
        }
    }

    /// Effective ratio in [1, 2]; doubles as the dry/wet blend.
    pub fn set_ratio(&mut self, ratio: Sample) {
        self.ratio = ratio.clamp(1.0, 2.0);
    }

    /// Drive time in samples of the base rate, set once at prepare.
    pub fn set_drive_time(&mut self, samples: Sample) {
        self.drive_time = samples.max(Sample::MIN_POSITIVE);
    }

    /// Process one oversampled channel in place.
    pub fn process_block(&self, buffer: &mut [Sample], state: &mut ChannelState) {
        let dry_amount = 2.0 - self.ratio;
        let wet_amount = self.ratio - 1.0;

        for sample in buffer.iter_mut() {
            let dry = *sample;

            let wet = if dry >= 0.0 {
                state.drive_env =
                    smooth(dry.abs(), state.prev_drive_env, self.drive_time * DRIVE_ENV_SCALE);
                state.prev_drive_env = state.drive_env;

                // Below clipping territory the slow envelope moves fast.
                let steps = if state.drive_env < CLIP_THRESHOLD {
                    self.drive_time - 0.99 * self.drive_time
                } else {
                    self.drive_time
                };
                state.drive =
                    smooth_scaled((0.5 * dry).abs(), state.prev_drive, steps, ENV_SPEED_FACTOR)
                        .clamp(0.0, 1.0);
                state.prev_drive = state.drive;

                // Weight toward higher drive amounts.
                let drive = state.drive * (2.0 - state.drive);

                clip_regions(sigmoid_cascade(dry, drive)) * CLIP_MAKEUP
            } else {
                -clip_regions(-dry)
            };

            *sample = dry * dry_amount + wet * wet_amount;
        }
    }
}

impl Default for Overdrive {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warmed_state() -> ChannelState {
        ChannelState {
            drive_env: 0.7,
            prev_drive_env: 0.7,
            drive: 0.4,
            prev_drive: 0.4,
            ..ChannelState::default()
        }
    }

    #[test]
    fn zero_input_is_a_fixed_point() {
        let mut od = Overdrive::new();
        od.set_ratio(2.0);
        od.set_drive_time(52_800.0);

        // Every branch is proportional in the input, including with a
        // non-zero drive envelope carried in from earlier material.
        for state in [ChannelState::default(), warmed_state()] {
            let mut state = state;
            let mut block = [0.0f32; 256];
            od.process_block(&mut block, &mut state);
            assert!(block.iter().all(|&s| s == 0.0));
        }
    }

    #[test]
    fn ratio_one_outputs_pure_dry() {
        let mut od = Overdrive::new();
        od.set_ratio(1.0);
        od.set_drive_time(52_800.0);

        let mut state = ChannelState::default();
        let input: Vec<f32> = (0..512).map(|i| (i as f32 * 0.05).sin() * 0.8).collect();
        let mut block = input.clone();
        od.process_block(&mut block, &mut state);

        for (out, inp) in block.iter().zip(&input) {
            assert!((out - inp).abs() < 1e-6);
        }
    }

    #[test]
    fn clipper_regions_are_continuous_at_the_lower_breakpoint() {
        let below = clip_regions(KNEE_LO - 1e-4);
        let above = clip_regions(KNEE_LO + 1e-4);
        assert!((below - above).abs() < 1e-2);
    }

    #[test]
    fn clipper_ceiling_is_flat() {
        let a = clip_regions(1.192);
        let b = clip_regions(5.0);
        assert_eq!(a, b);
        assert!((a - CEILING).abs() < 1e-6);
    }

    #[test]
    fn fully_wet_output_is_bounded() {
        let mut od = Overdrive::new();
        od.set_ratio(2.0);
        od.set_drive_time(52_800.0);

        let mut state = ChannelState::default();
        let mut block: Vec<f32> = (0..4096).map(|i| (i as f32 * 0.01).sin() * 2.0).collect();
        od.process_block(&mut block, &mut state);

        assert!(block.iter().all(|&s| s.is_finite()));
        assert!(block.iter().all(|&s| s.abs() <= CEILING * CLIP_MAKEUP + 1e-4));
    }

    #[test]
    fn negative_halves_skip_the_drive_envelope() {
        let mut od = Overdrive::new();
        od.set_ratio(2.0);
        od.set_drive_time(52_800.0);

        let mut state = ChannelState::default();
        let mut block = [-0.3f32; 128];
        od.process_block(&mut block, &mut state);

        // The drive envelopes only advance on non-negative samples.
        assert_eq!(state.drive_env, 0.0);
        assert_eq!(state.drive, 0.0);
        // Below the clipper knee the negative branch is a unity
        // pass-through: no sigmoid, no makeup gain.
        assert!((block[0] - (-0.3)).abs() < 1e-6);
    }

    #[test]
    fn makeup_gain_applies_to_the_positive_branch_only() {
        let mut od = Overdrive::new();
        od.set_ratio(2.0);
        od.set_drive_time(52_800.0);

        let mut pos_state = ChannelState::default();
        let mut neg_state = ChannelState::default();
        let mut pos = [0.3f32; 1];
        let mut neg = [-0.3f32; 1];
        od.process_block(&mut pos, &mut pos_state);
        od.process_block(&mut neg, &mut neg_state);

        // Negative small signals come back untouched; positive ones are
        // shaped by the sigmoid and the 1/0.9 makeup.
        assert_eq!(neg[0], -0.3);
        assert!((pos[0] - clip_regions(sigmoid_cascade(0.3, 0.0)) * CLIP_MAKEUP).abs() < 1e-4);
        assert!(pos[0].abs() != neg[0].abs());
    }

    #[test]
    fn drive_envelope_state_persists_across_blocks() {
        let mut od = Overdrive::new();
        od.set_ratio(2.0);
        od.set_drive_time(4_800.0);

        let mut state = ChannelState::default();
        let mut first = [0.8f32; 512];
        od.process_block(&mut first, &mut state);
        let env_after_first = state.drive_env;

        let mut second = [0.8f32; 512];
        od.process_block(&mut second, &mut state);

        assert!(env_after_first > 0.0);
        assert!(state.drive_env > env_after_first);
    }
}
