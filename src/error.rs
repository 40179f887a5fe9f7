//! Error types surfaced to the user

use std::path::PathBuf;
use thiserror::Error;

/// Failure to make the ONNX Runtime library available
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("runtime library not found at {0} and no download URL is configured")]
    MissingUrl(PathBuf),

    #[error("runtime download failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("runtime download from {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("runtime library could not be written: {0}")]
    Io(#[from] std::io::Error),

    #[error("runtime archive does not contain {0}")]
    Archive(String),

    #[error("runtime initialisation failed: {0}")]
    Init(String),
}

/// Failure anywhere in the preprocess / forward pass / ranking pipeline
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("no image selected")]
    NoImage,

    #[error("image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),

    #[error("unexpected tensor shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("{0}")]
    Runtime(String),

    #[error("inference worker stopped: {0}")]
    Worker(String),
}

impl From<anyhow::Error> for PredictionError {
    fn from(error: anyhow::Error) -> Self {
        PredictionError::Runtime(format!("{:#}", error))
    }
}
