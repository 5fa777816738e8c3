//! Error types for the Overwire engine

use thiserror::Error;

/// Engine error type. These only occur at prepare-time; the per-block
/// processing path never returns errors or panics.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    #[error("invalid maximum block size: {0}")]
    InvalidBlockSize(usize),

    #[error("unsupported channel count: {0}")]
    UnsupportedChannelCount(usize),

    #[error("anti-aliasing filter design failed: {0}")]
    FilterDesign(String),
}

/// Result type alias
pub type EngineResult<T> = Result<T, EngineError>;
