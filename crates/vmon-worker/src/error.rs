//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Worker spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Media error: {0}")]
    Media(#[from] vmon_media::MediaError),

}

impl WorkerError {
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    pub fn spawn_failed(msg: impl Into<String>) -> Self {
        Self::SpawnFailed(msg.into())
    }

    /// Opening the source failed; the worker exits without publishing.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable(_)
                | Self::Media(vmon_media::MediaError::SourceUnavailable(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmon_media::MediaError;

    #[test]
    fn test_source_unavailable_classification() {
        assert!(WorkerError::source_unavailable("camera:0").is_source_unavailable());
        assert!(WorkerError::from(MediaError::source_unavailable("x")).is_source_unavailable());
        assert!(!WorkerError::spawn_failed("no threads").is_source_unavailable());
        assert!(!WorkerError::from(MediaError::model_not_found("yolov8n.onnx"))
            .is_source_unavailable());
    }
}
