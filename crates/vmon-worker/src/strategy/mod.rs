//! Per-frame metric derivation.
//!
//! A strategy turns one frame and its vehicle detections into an annotated
//! frame plus the pipeline's metrics value. The worker loop is generic over
//! the strategy, so both pipelines share capture, detection and publishing.

mod lane_counting;
mod overlap_accident;

pub use lane_counting::{count_lanes, LaneCounting};
pub use overlap_accident::{detect_overlap, OverlapAccident, ACCIDENT_CAPTION};

use vmon_media::Frame;
use vmon_models::{Detection, PipelineKind};

/// Derives metrics from vehicle detections and annotates the frame.
pub trait MetricStrategy: Send + Sync + 'static {
    /// Value published alongside each frame. `Default` is the reset baseline.
    type Metrics: Clone + Default + Send + Sync + 'static;

    /// Pipeline this strategy drives.
    fn kind(&self) -> PipelineKind;

    /// `vehicles` holds only vehicle-class detections in pixel coordinates.
    fn compute(&self, frame: Frame, vehicles: &[Detection]) -> (Frame, Self::Metrics);
}
