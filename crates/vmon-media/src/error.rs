//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while capturing, detecting or encoding frames.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Video source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Frame read failed: {0}")]
    ReadFailed(String),

    #[error("Vehicle detection failed: {0}")]
    DetectionFailed(String),

    #[error("Frame encoding failed: {0}")]
    EncodeFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Font could not be loaded: {0}")]
    FontLoad(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a source-unavailable error.
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::SourceUnavailable(message.into())
    }

    pub fn read_failed(message: impl Into<String>) -> Self {
        Self::ReadFailed(message.into())
    }

    /// Create a detection failure error.
    pub fn detection_failed(message: impl Into<String>) -> Self {
        Self::DetectionFailed(message.into())
    }

    pub fn encode_failed(message: impl Into<String>) -> Self {
        Self::EncodeFailed(message.into())
    }

    /// Create a model not found error.
    pub fn model_not_found(path: impl Into<String>) -> Self {
        Self::ModelNotFound(path.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
