//! Error types for Collab-Mix.

use thiserror::Error;

/// Main error type for Collab-Mix operations.
#[derive(Error, Debug)]
pub enum MixError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Track not found: {0}")]
    NotFound(String),

    #[error("Track cannot record: {0}")]
    NotRecordable(String),

    #[error("Async runtime error: {0}")]
    Runtime(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Audio bytes the engine could not turn into a playable buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("no audio data")]
    Empty,

    #[error("malformed audio data: {0}")]
    Malformed(String),

    #[error("unsupported audio format: {0}")]
    Unsupported(String),
}

/// Microphone capture failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("no capture device available: {0}")]
    Unavailable(String),

    #[error("capture failed: {0}")]
    Failed(String),
}

impl MixError {
    /// Build an `InvalidParameter` error for a non-finite control value.
    pub fn non_finite(control: &str, value: f64) -> Self {
        Self::InvalidParameter(format!("{control} must be finite, got {value}"))
    }
}

/// Result type alias for Collab-Mix operations.
pub type Result<T> = std::result::Result<T, MixError>;
