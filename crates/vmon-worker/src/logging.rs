//! Structured pipeline logging utilities.
//!
//! Provides consistent, structured logging for worker lifecycle events
//! with tracing spans and contextual information.

use tracing::{error, info, warn, Span};
use vmon_models::{PipelineKind, SourceSpec};

/// Pipeline logger for structured logging with consistent formatting.
///
/// Every line carries the pipeline name and the source the worker was
/// started with.
#[derive(Debug, Clone)]
pub struct PipelineLogger {
    pipeline: PipelineKind,
    source: SourceSpec,
}

impl PipelineLogger {
    pub fn new(pipeline: PipelineKind, source: SourceSpec) -> Self {
        Self { pipeline, source }
    }

    /// Log the start of a worker.
    pub fn log_start(&self, message: &str) {
        info!(
            pipeline = %self.pipeline,
            source = %self.source,
            "Pipeline started: {}", message
        );
    }

    /// Log a routine milestone, such as a file looping back to its start.
    pub fn log_progress(&self, message: &str) {
        info!(
            pipeline = %self.pipeline,
            source = %self.source,
            "Pipeline progress: {}", message
        );
    }

    /// Log a recoverable problem; the worker keeps running.
    pub fn log_warning(&self, message: &str) {
        warn!(
            pipeline = %self.pipeline,
            source = %self.source,
            "Pipeline warning: {}", message
        );
    }

    /// Log an error that ends the worker.
    pub fn log_error(&self, message: &str) {
        error!(
            pipeline = %self.pipeline,
            source = %self.source,
            "Pipeline error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            pipeline = %self.pipeline,
            source = %self.source,
            "Pipeline stopped: {}", message
        );
    }

    /// Create a tracing span covering the worker thread.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "pipeline",
            pipeline = %self.pipeline,
            source = %self.source
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_logger_debug() {
        let logger = PipelineLogger::new(PipelineKind::Traffic, SourceSpec::Webcam);
        let debug = format!("{:?}", logger);
        assert!(debug.contains("Traffic"));
        assert!(debug.contains("Webcam"));
    }

    #[test]
    fn test_logging_without_subscriber() {
        let logger =
            PipelineLogger::new(PipelineKind::Accident, SourceSpec::PrerecordedAccident);
        let _guard = logger.create_span().entered();
        logger.log_start("opened");
        logger.log_progress("looped after 120 frames");
        logger.log_warning("end of stream");
        logger.log_completion("cancelled");
    }
}
