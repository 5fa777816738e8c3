//! 2x oversampling with linear-phase half-band FIR anti-aliasing
//!
//! The wet and dry paths each own one of these per channel, built from the
//! same design constants so their group delays match exactly and the
//! downstream dry/wet blend stays sample-aligned.
//!
//! Latency is a fixed integer number of base-rate samples, reported once
//! at prepare-time.

use std::f64::consts::PI;

use ow_core::{EngineError, EngineResult, Sample};

/// Fixed oversampling factor.
pub const OS_FACTOR: usize = 2;

/// Transition band width as a fraction of the half-band cutoff.
const TRANSITION: f64 = 0.15;

/// Stopband attenuation in dB.
const STOPBAND_DB: f64 = 90.0;

/// Linear-phase FIR with a ring-buffer delay line.
#[derive(Debug, Clone)]
struct FirFilter {
    coeffs: Vec<Sample>,
    state: Vec<Sample>,
    pos: usize,
}

impl FirFilter {
    fn new(coeffs: Vec<Sample>) -> Self {
        let len = coeffs.len();
        Self {
            coeffs,
            state: vec![0.0; len],
            pos: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: Sample) -> Sample {
        self.state[self.pos] = input;

        let n = self.state.len();
        let mut acc = 0.0;
        let mut idx = self.pos;
        for &c in &self.coeffs {
            acc += c * self.state[idx];
            idx = if idx == 0 { n - 1 } else { idx - 1 };
        }

        self.pos = (self.pos + 1) % n;
        acc
    }

    fn reset(&mut self) {
        self.state.fill(0.0);
        self.pos = 0;
    }
}

/// One channel's 2x up/down sampler pair.
#[derive(Debug, Clone)]
pub struct Oversampler2x {
    up: FirFilter,
    down: FirFilter,
    taps: usize,
}

impl Oversampler2x {
    pub fn new() -> EngineResult<Self> {
        let coeffs = design_half_band(TRANSITION, STOPBAND_DB)?;
        let taps = coeffs.len();
        Ok(Self {
            up: FirFilter::new(coeffs.clone()),
            down: FirFilter::new(coeffs),
            taps,
        })
    }

    /// Combined up+down latency in base-rate samples. Integer because the
    /// tap count is odd.
    pub fn latency(&self) -> usize {
        (self.taps - 1) / 2
    }

    /// Upsample a base-rate block into `output` (twice as long):
    /// zero-stuff, filter, compensate the interpolation gain.
    pub fn upsample_block(&mut self, input: &[Sample], output: &mut [Sample]) {
        debug_assert_eq!(output.len(), input.len() * OS_FACTOR);
        for (i, &x) in input.iter().enumerate() {
            output[OS_FACTOR * i] = self.up.process(x * OS_FACTOR as Sample);
            output[OS_FACTOR * i + 1] = self.up.process(0.0);
        }
    }

    /// Filter an oversampled block and decimate back to the base rate.
    pub fn downsample_block(&mut self, input: &[Sample], output: &mut [Sample]) {
        debug_assert_eq!(input.len(), output.len() * OS_FACTOR);
        for (i, out) in output.iter_mut().enumerate() {
            *out = self.down.process(input[OS_FACTOR * i]);
            let _ = self.down.process(input[OS_FACTOR * i + 1]);
        }
    }

    pub fn reset(&mut self) {
        self.up.reset();
        self.down.reset();
    }
}

/// Design the half-band lowpass (cutoff at a quarter of the oversampled
/// rate) as a Kaiser-windowed sinc. The tap count is estimated from the
/// attenuation/transition pair and forced odd so the cascade latency is an
/// integer at the base rate.
fn design_half_band(transition: f64, atten_db: f64) -> EngineResult<Vec<Sample>> {
    let cutoff = 0.25;
    let transition_width = transition * cutoff;
    if !(0.0..cutoff).contains(&transition_width) {
        return Err(EngineError::FilterDesign(format!(
            "invalid transition width {transition_width}"
        )));
    }

    // Kaiser estimate: N ~ (A - 7.95) / (14.36 * df), rounded up to odd.
    let mut num_taps = ((atten_db - 7.95) / (14.36 * transition_width)).ceil() as usize;
    if num_taps % 2 == 0 {
        num_taps += 1;
    }
    if num_taps < 3 {
        return Err(EngineError::FilterDesign(format!(
            "degenerate tap count {num_taps}"
        )));
    }

    let beta = kaiser_beta(atten_db);
    let m = (num_taps - 1) as f64;
    let alpha = m / 2.0;

    let mut coeffs = vec![0.0f64; num_taps];
    for (i, c) in coeffs.iter_mut().enumerate() {
        let n = i as f64 - alpha;

        let sinc = if n.abs() < 1e-12 {
            2.0 * cutoff
        } else {
            (2.0 * PI * cutoff * n).sin() / (PI * n)
        };

        let arg = 1.0 - ((i as f64 - alpha) / alpha).powi(2);
        let window = if arg > 0.0 {
            bessel_i0(beta * arg.sqrt()) / bessel_i0(beta)
        } else {
            0.0
        };

        *c = sinc * window;
    }

    // Unity gain at DC.
    let sum: f64 = coeffs.iter().sum();
    if sum.abs() < 1e-12 {
        return Err(EngineError::FilterDesign("zero DC gain".into()));
    }
    Ok(coeffs.iter().map(|&c| (c / sum) as Sample).collect())
}

/// Kaiser window beta for a given stopband attenuation.
fn kaiser_beta(atten_db: f64) -> f64 {
    if atten_db > 50.0 {
        0.1102 * (atten_db - 8.7)
    } else if atten_db >= 21.0 {
        0.5842 * (atten_db - 21.0).powf(0.4) + 0.07886 * (atten_db - 21.0)
    } else {
        0.0
    }
}

/// Modified Bessel function I0
fn bessel_i0(x: f64) -> f64 {
    let ax = x.abs();
    if ax < 3.75 {
        let y = (x / 3.75).powi(2);
        1.0 + y
            * (3.5156229
                + y * (3.0899424
                    + y * (1.2067492 + y * (0.2659732 + y * (0.0360768 + y * 0.0045813)))))
    } else {
        let y = 3.75 / ax;
        (ax.exp() / ax.sqrt())
            * (0.39894228
                + y * (0.01328592
                    + y * (0.00225319
                        + y * (-0.00157565
                            + y * (0.00916281
                                + y * (-0.02057706
                                    + y * (0.02635537 + y * (-0.01647633 + y * 0.00392377))))))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tap_count_is_odd_and_latency_integer() {
        let os = Oversampler2x::new().unwrap();
        assert_eq!(os.taps % 2, 1);
        assert_eq!(os.latency(), (os.taps - 1) / 2);
        assert!(os.latency() > 0);
    }

    #[test]
    fn coefficients_sum_to_unity() {
        let coeffs = design_half_band(TRANSITION, STOPBAND_DB).unwrap();
        let sum: f64 = coeffs.iter().map(|&c| c as f64).sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn round_trip_reproduces_a_delayed_sine() {
        let mut os = Oversampler2x::new().unwrap();
        let latency = os.latency();

        let len = 4096;
        let freq = 997.0 / 48_000.0;
        let input: Vec<f32> = (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq as f32 * i as f32).sin() * 0.5)
            .collect();

        let mut upsampled = vec![0.0f32; len * OS_FACTOR];
        let mut output = vec![0.0f32; len];
        os.upsample_block(&input, &mut upsampled);
        os.downsample_block(&upsampled, &mut output);

        // Skip the filter warm-up region, then require sample-accurate
        // alignment at the reported latency.
        for n in (latency + os.taps)..len {
            let expected = input[n - latency];
            assert!(
                (output[n] - expected).abs() < 1e-3,
                "n={n} out={} expected={expected}",
                output[n]
            );
        }
    }

    #[test]
    fn matched_filters_have_zero_relative_delay() {
        let mut wet = Oversampler2x::new().unwrap();
        let mut dry = Oversampler2x::new().unwrap();

        let len = 1024;
        let input: Vec<f32> = (0..len).map(|i| ((i * 37) % 101) as f32 / 101.0 - 0.5).collect();

        let mut wet_up = vec![0.0f32; len * OS_FACTOR];
        let mut dry_up = vec![0.0f32; len * OS_FACTOR];
        wet.upsample_block(&input, &mut wet_up);
        dry.upsample_block(&input, &mut dry_up);

        for (w, d) in wet_up.iter().zip(&dry_up) {
            assert_eq!(w, d);
        }
    }

    #[test]
    fn reset_clears_the_delay_lines() {
        let mut os = Oversampler2x::new().unwrap();
        let mut up = vec![0.0f32; 128];
        os.upsample_block(&[1.0; 64], &mut up);
        os.reset();

        let mut silent = vec![0.0f32; 128];
        os.upsample_block(&[0.0; 64], &mut silent);
        assert!(silent.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn stopband_rejects_the_image_band() {
        // A signal near the base-rate Nyquist must not leak energy into
        // the image band after upsampling.
        let coeffs = design_half_band(TRANSITION, STOPBAND_DB).unwrap();

        // Evaluate |H| at 0.4 cycles/sample of the oversampled rate
        // (well inside the stopband).
        let omega = 2.0 * PI * 0.4;
        let (mut re, mut im) = (0.0f64, 0.0f64);
        for (i, &c) in coeffs.iter().enumerate() {
            re += c as f64 * (omega * i as f64).cos();
            im -= c as f64 * (omega * i as f64).sin();
        }
        let mag_db = 20.0 * (re * re + im * im).sqrt().log10();
        assert!(mag_db < -80.0, "stopband magnitude {mag_db} dB");
    }
}
