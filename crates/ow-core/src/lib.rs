//! ow-core: Shared types and utilities for the Overwire engine
//!
//! This crate provides the foundational pieces used by `ow-dsp`:
//! sample/buffer types, dB conversions, the lock-free parameter store,
//! and error types.

mod error;
mod params;
mod sample;
mod units;

pub use error::*;
pub use params::*;
pub use sample::*;
pub use units::*;
