//! Error types for starlight-drift.
//!
//! Only configuration-time operations can fail. Audio processing itself never
//! returns an error: out-of-range values are clamped and an unprepared engine
//! renders nothing.

use thiserror::Error;

/// Error type for configuration, preset and serialisation operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid sample rate: {0}. Must be finite and greater than zero")]
    InvalidSampleRate(f64),

    #[error("Invalid block size: {0}. Must be at least one sample")]
    InvalidBlockSize(usize),

    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    #[error("Preset JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
