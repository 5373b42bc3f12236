//! The capture → detect → compute → publish loop.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge};
use vmon_media::{Detector, ReadOutcome, SourceLocator, SourceOpener, VideoSource};
use vmon_models::filter_vehicles;

use crate::cancel::CancellationToken;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::PipelineLogger;
use crate::shared_state::{Generation, SharedState};
use crate::strategy::MetricStrategy;
use crate::telemetry;

/// Why a worker loop returned normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// The cancellation token fired.
    Cancelled,
    /// The shared state was reset under it; a newer worker owns the output.
    Superseded,
}

/// One run of a pipeline against one source.
///
/// Blocking: run it on a dedicated thread. The loop checks the cancellation
/// token once per iteration and sleeps `frame_interval` between frames.
pub struct PipelineWorker<S: MetricStrategy> {
    strategy: Arc<S>,
    detector: Arc<dyn Detector>,
    opener: Arc<dyn SourceOpener>,
    locator: SourceLocator,
    shared: Arc<SharedState<S::Metrics>>,
    generation: Generation,
    cancel: CancellationToken,
    frame_interval: Duration,
    restart_backoff: Duration,
    logger: PipelineLogger,
}

impl<S: MetricStrategy> PipelineWorker<S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        strategy: Arc<S>,
        detector: Arc<dyn Detector>,
        opener: Arc<dyn SourceOpener>,
        locator: SourceLocator,
        shared: Arc<SharedState<S::Metrics>>,
        generation: Generation,
        cancel: CancellationToken,
        logger: PipelineLogger,
    ) -> Self {
        Self {
            strategy,
            detector,
            opener,
            locator,
            shared,
            generation,
            cancel,
            frame_interval: Duration::from_millis(20),
            restart_backoff: Duration::from_millis(500),
            logger,
        }
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn with_restart_backoff(mut self, backoff: Duration) -> Self {
        self.restart_backoff = backoff;
        self
    }

    /// Open the source and process frames until cancelled or superseded.
    ///
    /// Fails only when the source cannot be opened, in which case nothing
    /// has been published.
    pub fn run(self) -> WorkerResult<WorkerExit> {
        let span = self.logger.create_span();
        let _enter = span.enter();

        let mut source = match self.opener.open(&self.locator) {
            Ok(source) => source,
            Err(e) => {
                self.logger
                    .log_error(&format!("cannot open {}: {}", self.locator, e));
                return Err(WorkerError::source_unavailable(format!(
                    "{}: {}",
                    self.locator, e
                )));
            }
        };

        let pipeline = self.strategy.kind().as_str();
        gauge!(telemetry::WORKERS_ACTIVE, "pipeline" => pipeline).increment(1.0);
        self.logger.log_start(&format!("reading {}", self.locator));

        let exit = self.process(source.as_mut());

        gauge!(telemetry::WORKERS_ACTIVE, "pipeline" => pipeline).decrement(1.0);
        match exit {
            WorkerExit::Cancelled => self.logger.log_completion("cancelled"),
            WorkerExit::Superseded => self.logger.log_completion("superseded by a newer run"),
        }
        Ok(exit)
    }

    fn process(&self, source: &mut dyn VideoSource) -> WorkerExit {
        let pipeline = self.strategy.kind().as_str();
        // End-of-stream reads since the last delivered frame.
        let mut empty_reads: u32 = 0;
        let mut frames_read: u64 = 0;

        while !self.cancel.is_cancelled() {
            let frame = match source.read() {
                Ok(ReadOutcome::Frame(frame)) => {
                    empty_reads = 0;
                    frames_read += 1;
                    frame
                }
                Ok(ReadOutcome::EndOfStream) => {
                    if frames_read > 0 {
                        self.logger.log_progress(&format!(
                            "end of {} after {} frames, rewinding",
                            self.locator, frames_read
                        ));
                        frames_read = 0;
                    }
                    if self.restart(source, &mut empty_reads) {
                        return WorkerExit::Cancelled;
                    }
                    continue;
                }
                Err(e) => {
                    self.logger.log_warning(&format!("frame read failed: {}", e));
                    if self.restart(source, &mut empty_reads) {
                        return WorkerExit::Cancelled;
                    }
                    continue;
                }
            };

            match self.detector.detect(&frame) {
                Ok(detections) => {
                    let vehicles = filter_vehicles(detections);
                    let (annotated, metrics) = self.strategy.compute(frame, &vehicles);
                    if !self.shared.publish(self.generation, annotated, metrics) {
                        return WorkerExit::Superseded;
                    }
                    counter!(telemetry::FRAMES_PROCESSED_TOTAL, "pipeline" => pipeline)
                        .increment(1);
                }
                Err(e) => {
                    counter!(telemetry::DETECTOR_FAILURES_TOTAL, "pipeline" => pipeline)
                        .increment(1);
                    self.logger
                        .log_warning(&format!("detection failed, frame skipped: {}", e));
                }
            }

            if self.cancel.wait_timeout(self.frame_interval) {
                return WorkerExit::Cancelled;
            }
        }

        WorkerExit::Cancelled
    }

    /// Rewind after an exhausted or failed read. Returns `true` if cancelled
    /// while backing off.
    fn restart(&self, source: &mut dyn VideoSource, empty_reads: &mut u32) -> bool {
        *empty_reads += 1;
        counter!(telemetry::SOURCE_RESTARTS_TOTAL, "pipeline" => self.strategy.kind().as_str())
            .increment(1);

        if *empty_reads >= 2 {
            if *empty_reads == 2 {
                self.logger.log_warning(&format!(
                    "{} yields no frames, retrying every {:?}",
                    self.locator, self.restart_backoff
                ));
            }
            if self.cancel.wait_timeout(self.restart_backoff) {
                return true;
            }
        }

        if let Err(e) = source.rewind() {
            self.logger.log_warning(&format!("rewind failed: {}", e));
        }
        false
    }
}
