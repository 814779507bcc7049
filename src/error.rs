//! Crate error type.

use thiserror::Error;

/// Errors produced while running a speed test.
#[derive(Debug, Error)]
pub enum SpeedProbeError {
    /// The HTTP transport failed (connect, read or write).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// An endpoint URL could not be parsed.
    #[error("bad endpoint URL: {0}")]
    BadUrl(#[from] url::ParseError),
    /// Writing to an output sink failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// Serializing an event for output failed.
    #[error("serialize error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SpeedProbeError>;
