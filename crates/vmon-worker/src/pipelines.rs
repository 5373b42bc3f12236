//! The two pipeline instances served by the process.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;
use vmon_media::{
    Codec, DefaultSourceOpener, JpegCodec, Overlay, YoloDetector, YoloDetectorConfig,
};
use vmon_models::{AccidentState, LaneMetrics, PipelineStatus};

use crate::config::WorkerConfig;
use crate::controller::{PipelineController, PipelineDeps};
use crate::error::WorkerResult;
use crate::publisher::StreamPublisher;
use crate::strategy::{LaneCounting, OverlapAccident};

/// Traffic and accident pipelines. They share collaborators but no state.
pub struct Pipelines {
    pub traffic: PipelineController<LaneCounting>,
    pub accident: PipelineController<OverlapAccident>,
    codec: Arc<dyn Codec>,
    overlay: Overlay,
    streams_closed: watch::Sender<bool>,
}

impl Pipelines {
    pub fn new(config: WorkerConfig, deps: PipelineDeps, overlay: Overlay) -> Self {
        let codec: Arc<dyn Codec> = Arc::new(JpegCodec::new(config.jpeg_quality));
        let traffic = PipelineController::new(
            LaneCounting::new(overlay.clone()),
            deps.clone(),
            config.clone(),
        );
        let accident = PipelineController::new(
            OverlapAccident::new(overlay.clone(), config.accident_overlap_threshold),
            deps,
            config,
        );
        let (streams_closed, _) = watch::channel(false);
        Self {
            traffic,
            accident,
            codec,
            overlay,
            streams_closed,
        }
    }

    /// Build the production collaborators: the YOLO detector, the default
    /// source opener and, when configured, the caption font.
    pub fn from_config(config: WorkerConfig) -> WorkerResult<Self> {
        let detector = YoloDetector::new(YoloDetectorConfig {
            model_path: config.detector_model_path.to_string_lossy().into_owned(),
            confidence_threshold: config.detector_confidence,
            ..YoloDetectorConfig::default()
        })?;

        let overlay = match &config.overlay_font_path {
            Some(path) => Overlay::with_font_file(path)?,
            None => {
                info!("No overlay font configured, frame captions disabled");
                Overlay::new()
            }
        };

        let deps = PipelineDeps::new(Arc::new(detector), Arc::new(DefaultSourceOpener));
        Ok(Self::new(config, deps, overlay))
    }

    /// A fresh MJPEG stream over the traffic pipeline.
    pub fn traffic_stream(&self) -> StreamPublisher<LaneMetrics> {
        StreamPublisher::new(self.traffic.shared(), Arc::clone(&self.codec), &self.overlay)
            .with_shutdown(self.streams_closed.subscribe())
    }

    pub fn accident_stream(&self) -> StreamPublisher<AccidentState> {
        StreamPublisher::new(self.accident.shared(), Arc::clone(&self.codec), &self.overlay)
            .with_shutdown(self.streams_closed.subscribe())
    }

    /// End every open MJPEG stream at its next chunk.
    pub fn close_streams(&self) {
        self.streams_closed.send_replace(true);
        info!("Closing video streams");
    }

    pub async fn status(&self) -> Vec<PipelineStatus> {
        vec![self.traffic.status().await, self.accident.status().await]
    }

    /// Stop both pipelines and wait for their workers.
    pub async fn shutdown(&self) {
        tokio::join!(self.traffic.shutdown(), self.accident.shutdown());
        info!("Pipelines shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use vmon_media::{Detector, Frame, MediaResult, MemorySourceOpener, SourceLocator};
    use vmon_models::{BBox, Detection, PipelineKind, PipelineState, SourceSpec};

    struct Pileup;

    impl Detector for Pileup {
        fn detect(&self, _frame: &Frame) -> MediaResult<Vec<Detection>> {
            Ok(vec![
                Detection::new(2, BBox::new(0, 0, 100, 100)),
                Detection::new(2, BBox::new(0, 0, 100, 100)),
            ])
        }
    }

    fn pipelines() -> Pipelines {
        let config = WorkerConfig {
            frame_interval: Duration::from_millis(1),
            ..WorkerConfig::default()
        };
        let opener = MemorySourceOpener::new()
            .with_source(
                config.locator_for(SourceSpec::PrerecordedAccident),
                vec![Frame::new(200, 200)],
            )
            .with_source(SourceLocator::Camera(0), vec![Frame::new(200, 200)]);
        Pipelines::new(
            config,
            PipelineDeps::new(Arc::new(Pileup), Arc::new(opener)),
            Overlay::new(),
        )
    }

    #[tokio::test]
    async fn test_pipelines_are_independent() {
        let pipelines = pipelines();
        pipelines
            .accident
            .start(SourceSpec::PrerecordedAccident)
            .await
            .unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !pipelines.accident.metrics().accident_detected {
            assert!(std::time::Instant::now() < deadline);
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        assert_eq!(pipelines.traffic.metrics(), LaneMetrics::default());
        assert!(pipelines.traffic.snapshot().frame.is_none());

        let status = pipelines.status().await;
        assert_eq!(status[0].pipeline, PipelineKind::Traffic);
        assert_eq!(status[0].state, PipelineState::Idle);
        assert_eq!(status[1].pipeline, PipelineKind::Accident);
        assert_eq!(status[1].state, PipelineState::Running);

        pipelines.shutdown().await;
        let status = pipelines.status().await;
        assert!(status.iter().all(|s| s.state == PipelineState::Idle && !s.worker_alive));
    }
}
