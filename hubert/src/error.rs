use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by unit extraction.
#[derive(Debug, Error)]
pub enum HubertError {
    #[error("no *.{ext} checkpoint found under {}", .dir.display())]
    ModelNotFound { dir: PathBuf, ext: &'static str },

    #[error("model load failed: {0}")]
    ModelLoad(String),

    #[error("cache read failed for {}: {message}", .path.display())]
    CacheRead { path: PathBuf, message: String },

    #[error("cache write failed for {}: {message}", .path.display())]
    CacheWrite { path: PathBuf, message: String },

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("audio decode failed: {0}")]
    Audio(String),

    #[error("sample rate too low: need at least {min} Hz, got {got} Hz")]
    SampleRateTooLow { got: u32, min: u32 },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
