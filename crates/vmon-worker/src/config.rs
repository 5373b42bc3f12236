//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use vmon_media::SourceLocator;
use vmon_models::SourceSpec;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Media played for the `prerecorded` source
    pub traffic_video_path: PathBuf,
    /// Media played for the `prerecorded_accident` source
    pub accident_video_path: PathBuf,
    /// Capture device opened for the `webcam` source
    pub webcam_index: i32,
    /// Pause between processed frames
    pub frame_interval: Duration,
    /// How long `start` waits for the previous worker to exit
    pub stop_timeout: Duration,
    /// Pause before rewinding a source that produced no frame since the last rewind
    pub restart_backoff: Duration,
    /// Overlap area (px²) above which two vehicles are reported as an accident
    pub accident_overlap_threshold: i64,
    /// JPEG quality for streamed frames
    pub jpeg_quality: u8,
    /// TrueType font for overlay captions; captions are skipped without one
    pub overlay_font_path: Option<PathBuf>,
    pub detector_model_path: PathBuf,
    pub detector_confidence: f32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            traffic_video_path: PathBuf::from("traffic_video.mp4"),
            accident_video_path: PathBuf::from("accident_video.mp4"),
            webcam_index: 0,
            frame_interval: Duration::from_millis(20),
            stop_timeout: Duration::from_secs(2),
            restart_backoff: Duration::from_millis(500),
            accident_overlap_threshold: 5000,
            jpeg_quality: 80,
            overlay_font_path: None,
            detector_model_path: PathBuf::from("models/object_detection/yolov8n.onnx"),
            detector_confidence: 0.25,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            traffic_video_path: std::env::var("TRAFFIC_VIDEO_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.traffic_video_path),
            accident_video_path: std::env::var("ACCIDENT_VIDEO_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.accident_video_path),
            webcam_index: std::env::var("WEBCAM_INDEX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.webcam_index),
            frame_interval: Duration::from_millis(
                std::env::var("PIPELINE_FRAME_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(20),
            ),
            stop_timeout: Duration::from_secs(
                std::env::var("PIPELINE_STOP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            ),
            restart_backoff: Duration::from_millis(
                std::env::var("PIPELINE_RESTART_BACKOFF_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
            ),
            accident_overlap_threshold: std::env::var("ACCIDENT_OVERLAP_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.accident_overlap_threshold),
            jpeg_quality: std::env::var("STREAM_JPEG_QUALITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.jpeg_quality),
            overlay_font_path: std::env::var("OVERLAY_FONT_PATH")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            detector_model_path: std::env::var("DETECTOR_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.detector_model_path),
            detector_confidence: std::env::var("DETECTOR_CONFIDENCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.detector_confidence),
        }
    }

    /// Resolve a control-surface source to the media it plays.
    pub fn locator_for(&self, source: SourceSpec) -> SourceLocator {
        match source {
            SourceSpec::Prerecorded => SourceLocator::File(self.traffic_video_path.clone()),
            SourceSpec::Webcam => SourceLocator::Camera(self.webcam_index),
            SourceSpec::PrerecordedAccident => {
                SourceLocator::File(self.accident_video_path.clone())
            }
        }
    }
}
