//! Lock-free parameter store
//!
//! The UI thread writes individual values through atomic cells; the audio
//! thread reads the latest values once per block. Each value is internally
//! atomic, no cross-parameter consistency is guaranteed within a block.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::Sample;

/// Atomic f32 cell for single-writer/single-reader traffic.
#[derive(Debug)]
pub struct AtomicF32 {
    bits: AtomicU32,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl Default for AtomicF32 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Raw parameter domains, as exposed to the host.
pub const RATIO_RANGE: (Sample, Sample) = (0.0, 100.0);
pub const THRESHOLD_RANGE_DB: (Sample, Sample) = (-24.0, 0.0);
pub const ATTACK_RANGE_MS: (Sample, Sample) = (0.1, 200.0);
pub const RELEASE_RANGE_MS: (Sample, Sample) = (0.1, 800.0);
pub const MIX_RANGE: (Sample, Sample) = (0.0, 100.0);
pub const GAIN_RANGE_DB: (Sample, Sample) = (-24.0, 24.0);

/// Raw (host-facing) parameter values.
///
/// Values outside the documented domains are clamped by the store, never
/// rejected. Serializable as an opaque name-to-value mapping for the
/// host's state persistence; no file format is defined here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawParams {
    /// Compressor ratio control, 0-100 (remapped to [1, 2] by the engine)
    pub ratio: Sample,
    /// Compressor threshold in dB, -24..0
    pub threshold_db: Sample,
    /// Compressor attack in milliseconds, 0.1..200
    pub attack_ms: Sample,
    /// Compressor release in milliseconds, 0.1..800
    pub release_ms: Sample,
    /// Dry/wet mix in percent, 0..100
    pub mix: Sample,
    /// Input gain in dB, -24..24
    pub input_gain_db: Sample,
    /// Output gain in dB, -24..24
    pub output_gain_db: Sample,
}

impl Default for RawParams {
    fn default() -> Self {
        Self {
            ratio: 100.0,
            threshold_db: -12.0,
            attack_ms: 20.0,
            release_ms: 10.0,
            mix: 100.0,
            input_gain_db: 0.0,
            output_gain_db: 0.0,
        }
    }
}

impl RawParams {
    /// Clamp every field into its documented domain. NaN inputs collapse
    /// to the lower bound.
    pub fn clamped(self) -> Self {
        Self {
            ratio: clamp_or_min(self.ratio, RATIO_RANGE),
            threshold_db: clamp_or_min(self.threshold_db, THRESHOLD_RANGE_DB),
            attack_ms: clamp_or_min(self.attack_ms, ATTACK_RANGE_MS),
            release_ms: clamp_or_min(self.release_ms, RELEASE_RANGE_MS),
            mix: clamp_or_min(self.mix, MIX_RANGE),
            input_gain_db: clamp_or_min(self.input_gain_db, GAIN_RANGE_DB),
            output_gain_db: clamp_or_min(self.output_gain_db, GAIN_RANGE_DB),
        }
    }
}

#[inline]
fn clamp_or_min(value: Sample, (min, max): (Sample, Sample)) -> Sample {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

/// Shared parameter store, one atomic cell per parameter.
#[derive(Debug)]
pub struct ParamStore {
    ratio: AtomicF32,
    threshold_db: AtomicF32,
    attack_ms: AtomicF32,
    release_ms: AtomicF32,
    mix: AtomicF32,
    input_gain_db: AtomicF32,
    output_gain_db: AtomicF32,
}

impl ParamStore {
    pub fn new(initial: RawParams) -> Self {
        let p = initial.clamped();
        Self {
            ratio: AtomicF32::new(p.ratio),
            threshold_db: AtomicF32::new(p.threshold_db),
            attack_ms: AtomicF32::new(p.attack_ms),
            release_ms: AtomicF32::new(p.release_ms),
            mix: AtomicF32::new(p.mix),
            input_gain_db: AtomicF32::new(p.input_gain_db),
            output_gain_db: AtomicF32::new(p.output_gain_db),
        }
    }

    /// Publish a full set of raw values, clamping each into its domain.
    pub fn store(&self, raw: RawParams) {
        let p = raw.clamped();
        self.ratio.set(p.ratio);
        self.threshold_db.set(p.threshold_db);
        self.attack_ms.set(p.attack_ms);
        self.release_ms.set(p.release_ms);
        self.mix.set(p.mix);
        self.input_gain_db.set(p.input_gain_db);
        self.output_gain_db.set(p.output_gain_db);
    }

    /// Read the latest published values (audio thread, once per block).
    pub fn load(&self) -> RawParams {
        RawParams {
            ratio: self.ratio.get(),
            threshold_db: self.threshold_db.get(),
            attack_ms: self.attack_ms.get(),
            release_ms: self.release_ms.get(),
            mix: self.mix.get(),
            input_gain_db: self.input_gain_db.get(),
            output_gain_db: self.output_gain_db.get(),
        }
    }

    pub fn set_ratio(&self, value: Sample) {
        self.ratio.set(clamp_or_min(value, RATIO_RANGE));
    }

    pub fn set_threshold_db(&self, value: Sample) {
        self.threshold_db.set(clamp_or_min(value, THRESHOLD_RANGE_DB));
    }

    pub fn set_attack_ms(&self, value: Sample) {
        self.attack_ms.set(clamp_or_min(value, ATTACK_RANGE_MS));
    }

    pub fn set_release_ms(&self, value: Sample) {
        self.release_ms.set(clamp_or_min(value, RELEASE_RANGE_MS));
    }

    pub fn set_mix(&self, value: Sample) {
        self.mix.set(clamp_or_min(value, MIX_RANGE));
    }

    pub fn set_input_gain_db(&self, value: Sample) {
        self.input_gain_db.set(clamp_or_min(value, GAIN_RANGE_DB));
    }

    pub fn set_output_gain_db(&self, value: Sample) {
        self.output_gain_db.set(clamp_or_min(value, GAIN_RANGE_DB));
    }
}

impl Default for ParamStore {
    fn default() -> Self {
        Self::new(RawParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_values_are_clamped() {
        let store = ParamStore::default();
        store.store(RawParams {
            ratio: 250.0,
            threshold_db: 5.0,
            attack_ms: -1.0,
            release_ms: 10_000.0,
            mix: 101.0,
            input_gain_db: -99.0,
            output_gain_db: 99.0,
        });

        let p = store.load();
        assert_eq!(p.ratio, 100.0);
        assert_eq!(p.threshold_db, 0.0);
        assert_eq!(p.attack_ms, 0.1);
        assert_eq!(p.release_ms, 800.0);
        assert_eq!(p.mix, 100.0);
        assert_eq!(p.input_gain_db, -24.0);
        assert_eq!(p.output_gain_db, 24.0);
    }

    #[test]
    fn nan_collapses_to_lower_bound() {
        let p = RawParams {
            ratio: f32::NAN,
            ..RawParams::default()
        }
        .clamped();
        assert_eq!(p.ratio, 0.0);
    }

    #[test]
    fn defaults_match_the_parameter_layout() {
        let p = RawParams::default();
        assert_eq!(p.ratio, 100.0);
        assert_eq!(p.threshold_db, -12.0);
        assert_eq!(p.attack_ms, 20.0);
        assert_eq!(p.release_ms, 10.0);
        assert_eq!(p.mix, 100.0);
        assert_eq!(p.input_gain_db, 0.0);
        assert_eq!(p.output_gain_db, 0.0);
    }

    #[test]
    fn serializes_as_a_name_value_mapping() {
        let json = serde_json::to_value(RawParams::default()).unwrap();
        assert_eq!(json["ratio"], 100.0);
        assert_eq!(json["threshold_db"], -12.0);

        let back: RawParams = serde_json::from_value(json).unwrap();
        assert_eq!(back, RawParams::default());
    }

    #[test]
    fn atomic_cell_round_trips() {
        let cell = AtomicF32::new(0.25);
        assert_eq!(cell.get(), 0.25);
        cell.set(-3.5);
        assert_eq!(cell.get(), -3.5);
    }
}
