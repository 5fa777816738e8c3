//! Decibel / linear gain conversions

use crate::Sample;

/// Floor value returned for a zero-amplitude signal.
pub const MINUS_INFINITY_DB: Sample = -100.0;

/// Convert decibels to a linear gain factor.
#[inline]
pub fn db_to_gain(db: Sample) -> Sample {
    if db > MINUS_INFINITY_DB {
        10.0f32.powf(db * 0.05)
    } else {
        0.0
    }
}

/// Convert a linear gain factor to decibels, with a -100 dB floor.
#[inline]
pub fn gain_to_db(gain: Sample) -> Sample {
    if gain > 0.0 {
        (20.0 * gain.log10()).max(MINUS_INFINITY_DB)
    } else {
        MINUS_INFINITY_DB
    }
}
