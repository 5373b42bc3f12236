//! Pipeline lifecycle control.
//!
//! A [`PipelineController`] owns one pipeline's [`SharedState`] and at most
//! one active worker thread. `start` always hands over: the previous worker
//! is cancelled and awaited (bounded by the stop timeout), the state is
//! reset to its baseline, and only then is the next worker spawned.

use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};
use vmon_media::{Detector, SourceOpener};
use vmon_models::{PipelineKind, PipelineState, PipelineStatus, SourceSpec};

use crate::cancel::CancellationToken;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::PipelineLogger;
use crate::shared_state::{MetricsReader, SharedState, Snapshot};
use crate::strategy::MetricStrategy;
use crate::worker::{PipelineWorker, WorkerExit};

/// Collaborators shared by every worker a controller spawns.
#[derive(Clone)]
pub struct PipelineDeps {
    pub detector: Arc<dyn Detector>,
    pub opener: Arc<dyn SourceOpener>,
}

impl PipelineDeps {
    pub fn new(detector: Arc<dyn Detector>, opener: Arc<dyn SourceOpener>) -> Self {
        Self { detector, opener }
    }
}

struct ActiveWorker {
    cancel: CancellationToken,
    thread: JoinHandle<()>,
    done: oneshot::Receiver<WorkerResult<WorkerExit>>,
}

// Dropping the handle cancels the worker.
impl Drop for ActiveWorker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[derive(Default)]
struct ControllerInner {
    state: PipelineState,
    source: Option<SourceSpec>,
    // Kept after `stop` until the next `start` has waited for it.
    worker: Option<ActiveWorker>,
}

/// Start/stop lifecycle for one pipeline instance.
pub struct PipelineController<S: MetricStrategy> {
    strategy: Arc<S>,
    deps: PipelineDeps,
    config: WorkerConfig,
    shared: Arc<SharedState<S::Metrics>>,
    inner: Mutex<ControllerInner>,
}

impl<S: MetricStrategy> PipelineController<S> {
    pub fn new(strategy: S, deps: PipelineDeps, config: WorkerConfig) -> Self {
        Self {
            strategy: Arc::new(strategy),
            deps,
            config,
            shared: Arc::new(SharedState::new()),
            inner: Mutex::new(ControllerInner::default()),
        }
    }

    pub fn kind(&self) -> PipelineKind {
        self.strategy.kind()
    }

    /// (Re)start the pipeline on `source`.
    ///
    /// Any previous worker is cancelled and awaited for up to the stop
    /// timeout; the call proceeds regardless. The shared state is back at
    /// its baseline before the new worker exists. A source that fails to
    /// open is reported by the worker, not here: the pipeline is Running
    /// with no live worker and its output stays at the baseline.
    pub async fn start(&self, source: SourceSpec) -> WorkerResult<()> {
        let mut inner = self.inner.lock().await;

        if let Some(previous) = inner.worker.take() {
            previous.cancel.cancel();
            self.drain(previous).await;
        }
        inner.state = PipelineState::Idle;

        let generation = self.shared.reset();
        let cancel = CancellationToken::new();
        let locator = self.config.locator_for(source);
        let logger = PipelineLogger::new(self.kind(), source);

        let worker = PipelineWorker::new(
            Arc::clone(&self.strategy),
            Arc::clone(&self.deps.detector),
            Arc::clone(&self.deps.opener),
            locator,
            Arc::clone(&self.shared),
            generation,
            cancel.clone(),
            logger,
        )
        .with_frame_interval(self.config.frame_interval)
        .with_restart_backoff(self.config.restart_backoff);

        let (tx, done) = oneshot::channel();
        let thread = std::thread::Builder::new()
            .name(format!("{}-worker", self.kind()))
            .spawn(move || {
                let _ = tx.send(worker.run());
            })
            .map_err(|e| WorkerError::spawn_failed(e.to_string()))?;

        inner.worker = Some(ActiveWorker {
            cancel,
            thread,
            done,
        });
        inner.state = PipelineState::Running;
        inner.source = Some(source);

        info!(
            pipeline = %self.kind(),
            source = %source,
            generation = generation.value(),
            "Pipeline started"
        );
        Ok(())
    }

    /// Signal the worker to stop and go Idle. A no-op when already Idle.
    ///
    /// Does not wait for the worker thread; the next `start` does.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        if !inner.state.is_running() {
            debug!(pipeline = %self.kind(), "Stop requested while idle");
            return;
        }
        if let Some(worker) = &inner.worker {
            worker.cancel.cancel();
        }
        inner.state = PipelineState::Idle;
        info!(pipeline = %self.kind(), "Pipeline stopped");
    }

    /// Stop and wait for the worker thread, bounded by the stop timeout.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = PipelineState::Idle;
        if let Some(worker) = inner.worker.take() {
            worker.cancel.cancel();
            self.drain(worker).await;
        }
    }

    pub async fn status(&self) -> PipelineStatus {
        let inner = self.inner.lock().await;
        PipelineStatus {
            pipeline: self.kind(),
            state: inner.state,
            source: inner.source,
            worker_alive: inner
                .worker
                .as_ref()
                .map(|w| !w.thread.is_finished())
                .unwrap_or(false),
        }
    }

    /// Copy of the latest metrics. Never blocks on the lifecycle lock.
    pub fn metrics(&self) -> S::Metrics {
        self.shared.metrics()
    }

    pub fn reader(&self) -> MetricsReader<S::Metrics> {
        MetricsReader::new(Arc::clone(&self.shared))
    }

    pub fn snapshot(&self) -> Arc<Snapshot<S::Metrics>> {
        self.shared.snapshot()
    }

    pub fn shared(&self) -> Arc<SharedState<S::Metrics>> {
        Arc::clone(&self.shared)
    }

    async fn drain(&self, mut worker: ActiveWorker) {
        match tokio::time::timeout(self.config.stop_timeout, &mut worker.done).await {
            Ok(Ok(Ok(exit))) => {
                debug!(pipeline = %self.kind(), ?exit, "Previous worker exited");
            }
            Ok(Ok(Err(e))) => {
                debug!(pipeline = %self.kind(), error = %e, "Previous worker had failed");
            }
            Ok(Err(_)) => {
                warn!(pipeline = %self.kind(), "Previous worker ended without reporting");
            }
            Err(_) => {
                warn!(
                    pipeline = %self.kind(),
                    timeout = ?self.config.stop_timeout,
                    "Previous worker did not stop in time, detaching it"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use image::Rgb;
    use vmon_media::{
        Frame, MediaError, MediaResult, MemorySourceOpener, ReadOutcome, SourceLocator,
        VideoSource,
    };
    use vmon_models::{BBox, Detection, LaneMetrics};

    use crate::strategy::LaneCounting;

    struct TwoCars;

    impl Detector for TwoCars {
        fn detect(&self, frame: &Frame) -> MediaResult<Vec<Detection>> {
            let w = frame.width() as i32;
            Ok(vec![
                Detection::new(2, BBox::new(0, 0, 4, 4)),
                Detection::new(7, BBox::new(w - 4, 0, w, 4)),
            ])
        }
    }

    /// Tracks how many opened sources are alive at once.
    #[derive(Default)]
    struct CountingOpener {
        inner: MemorySourceOpener,
        live: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        opened: Arc<AtomicUsize>,
    }

    struct CountedSource {
        inner: Box<dyn VideoSource>,
        live: Arc<AtomicUsize>,
    }

    impl VideoSource for CountedSource {
        fn read(&mut self) -> MediaResult<ReadOutcome> {
            self.inner.read()
        }

        fn rewind(&mut self) -> MediaResult<()> {
            self.inner.rewind()
        }
    }

    impl Drop for CountedSource {
        fn drop(&mut self) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl SourceOpener for CountingOpener {
        fn open(&self, locator: &SourceLocator) -> MediaResult<Box<dyn VideoSource>> {
            let inner = self.inner.open(locator)?;
            let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountedSource {
                inner,
                live: Arc::clone(&self.live),
            }))
        }
    }

    fn test_config() -> WorkerConfig {
        WorkerConfig {
            frame_interval: Duration::from_millis(1),
            restart_backoff: Duration::from_millis(5),
            ..WorkerConfig::default()
        }
    }

    fn frames() -> Vec<Frame> {
        vec![Frame::from_pixel(40, 20, Rgb([9, 9, 9]))]
    }

    fn controller(opener: Arc<dyn SourceOpener>) -> PipelineController<LaneCounting> {
        PipelineController::new(
            LaneCounting::default(),
            PipelineDeps::new(Arc::new(TwoCars), opener),
            test_config(),
        )
    }

    fn webcam_opener() -> MemorySourceOpener {
        MemorySourceOpener::new().with_source(SourceLocator::Camera(0), frames())
    }

    async fn wait_for(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    #[tokio::test]
    async fn test_initially_idle() {
        let ctl = controller(Arc::new(webcam_opener()));
        let status = ctl.status().await;
        assert_eq!(status.state, PipelineState::Idle);
        assert_eq!(status.pipeline, PipelineKind::Traffic);
        assert!(status.source.is_none());
        assert!(!status.worker_alive);
        assert!(ctl.snapshot().frame.is_none());
    }

    #[tokio::test]
    async fn test_start_publishes_metrics() {
        let ctl = controller(Arc::new(webcam_opener()));
        ctl.start(SourceSpec::Webcam).await.unwrap();

        wait_for(|| ctl.metrics().total_vehicles == 2).await;
        let metrics = ctl.metrics();
        assert_eq!(metrics.lane_a.vehicle_count, 1);
        assert_eq!(metrics.lane_b.vehicle_count, 1);
        assert_eq!(metrics.lane_a.green_light_duration, 35);

        let status = ctl.status().await;
        assert_eq!(status.state, PipelineState::Running);
        assert_eq!(status.source, Some(SourceSpec::Webcam));
        assert!(status.worker_alive);

        ctl.shutdown().await;
        assert!(!ctl.status().await.worker_alive);
    }

    #[tokio::test]
    async fn test_restart_keeps_single_worker() {
        let opener = Arc::new(CountingOpener {
            inner: webcam_opener(),
            ..Default::default()
        });
        let ctl = controller(opener.clone());

        for _ in 0..3 {
            ctl.start(SourceSpec::Webcam).await.unwrap();
            wait_for(|| ctl.snapshot().frame.is_some()).await;
        }

        assert_eq!(opener.opened.load(Ordering::SeqCst), 3);
        assert_eq!(opener.peak.load(Ordering::SeqCst), 1);
        assert_eq!(opener.live.load(Ordering::SeqCst), 1);

        ctl.shutdown().await;
        assert_eq!(opener.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_restart_resets_to_baseline() {
        // Only the webcam is registered, so the second run never publishes.
        let ctl = controller(Arc::new(webcam_opener()));
        ctl.start(SourceSpec::Webcam).await.unwrap();
        wait_for(|| ctl.snapshot().frame.is_some()).await;

        ctl.start(SourceSpec::Prerecorded).await.unwrap();
        let snap = ctl.snapshot();
        assert!(snap.frame.is_none());
        assert_eq!(snap.metrics, LaneMetrics::default());

        wait_for_dead(&ctl).await;
        assert!(ctl.snapshot().frame.is_none());
        assert_eq!(ctl.metrics(), LaneMetrics::default());
    }

    async fn wait_for_dead(ctl: &PipelineController<LaneCounting>) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while ctl.status().await.worker_alive {
            assert!(Instant::now() < deadline, "worker still alive");
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    #[tokio::test]
    async fn test_unavailable_source_stays_at_baseline() {
        let ctl = controller(Arc::new(MemorySourceOpener::new()));
        ctl.start(SourceSpec::Webcam).await.unwrap();
        wait_for_dead(&ctl).await;

        let status = ctl.status().await;
        assert_eq!(status.state, PipelineState::Running);
        assert!(!status.worker_alive);
        assert!(ctl.snapshot().frame.is_none());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let ctl = controller(Arc::new(webcam_opener()));
        ctl.stop().await;
        ctl.stop().await;
        assert_eq!(ctl.status().await.state, PipelineState::Idle);

        ctl.start(SourceSpec::Webcam).await.unwrap();
        ctl.stop().await;
        ctl.stop().await;
        assert_eq!(ctl.status().await.state, PipelineState::Idle);
        wait_for_dead(&ctl).await;
    }

    #[tokio::test]
    async fn test_stop_keeps_last_output() {
        let ctl = controller(Arc::new(webcam_opener()));
        ctl.start(SourceSpec::Webcam).await.unwrap();
        wait_for(|| ctl.snapshot().frame.is_some()).await;

        ctl.stop().await;
        wait_for_dead(&ctl).await;
        assert!(ctl.snapshot().frame.is_some());
        assert_eq!(ctl.metrics().total_vehicles, 2);
    }

    /// Blocks on the first webcam frame, well past the stop timeout, and
    /// answers exactly once for wider prerecorded frames.
    #[derive(Default)]
    struct StuckWebcam {
        entered: AtomicBool,
        returned: AtomicBool,
        fast_calls: AtomicUsize,
    }

    impl Detector for StuckWebcam {
        fn detect(&self, frame: &Frame) -> MediaResult<Vec<Detection>> {
            if frame.width() == 40 {
                self.entered.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(400));
                self.returned.store(true, Ordering::SeqCst);
                return Ok(vec![Detection::new(2, BBox::new(0, 0, 4, 4))]);
            }
            if self.fast_calls.fetch_add(1, Ordering::SeqCst) > 0 {
                return Err(MediaError::detection_failed("one answer only"));
            }
            Ok(vec![
                Detection::new(2, BBox::new(0, 0, 4, 4)),
                Detection::new(3, BBox::new(10, 0, 14, 4)),
                Detection::new(7, BBox::new(70, 0, 80, 4)),
            ])
        }
    }

    #[tokio::test]
    async fn test_start_detaches_worker_that_ignores_cancellation() {
        let config = WorkerConfig {
            stop_timeout: Duration::from_millis(50),
            ..test_config()
        };
        let opener = webcam_opener().with_source(
            config.locator_for(SourceSpec::Prerecorded),
            vec![Frame::from_pixel(80, 20, Rgb([9, 9, 9]))],
        );
        let detector = Arc::new(StuckWebcam::default());
        let ctl = PipelineController::new(
            LaneCounting::default(),
            PipelineDeps::new(detector.clone(), Arc::new(opener)),
            config,
        );

        ctl.start(SourceSpec::Webcam).await.unwrap();
        wait_for(|| detector.entered.load(Ordering::SeqCst)).await;

        let begun = Instant::now();
        ctl.start(SourceSpec::Prerecorded).await.unwrap();
        assert!(
            begun.elapsed() < Duration::from_millis(300),
            "start waited {:?} for a stuck worker",
            begun.elapsed()
        );
        assert!(!detector.returned.load(Ordering::SeqCst));

        wait_for(|| ctl.metrics().total_vehicles == 3).await;

        // The detached worker wakes up and tries to publish one car.
        wait_for(|| detector.returned.load(Ordering::SeqCst)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let snap = ctl.snapshot();
        assert_eq!(snap.generation, ctl.shared().generation());
        assert_eq!(snap.metrics.total_vehicles, 3);
        assert_eq!(snap.metrics.lane_a.vehicle_count, 2);
        assert_eq!(snap.metrics.lane_b.vehicle_count, 1);
        assert_eq!(snap.frame.as_ref().map(|f| f.width()), Some(80));

        ctl.shutdown().await;
    }
}
