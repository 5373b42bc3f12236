use vmon_media::{Frame, Overlay};
use vmon_models::{AccidentState, Detection, PipelineKind};

use super::MetricStrategy;

pub const ACCIDENT_CAPTION: &str = "ACCIDENT DETECTED";

/// Flags an accident when any two vehicle boxes overlap by more than a
/// fixed area.
#[derive(Clone)]
pub struct OverlapAccident {
    overlay: Overlay,
    threshold: i64,
}

impl OverlapAccident {
    pub const DEFAULT_THRESHOLD: i64 = 5000;

    pub fn new(overlay: Overlay, threshold: i64) -> Self {
        Self { overlay, threshold }
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }
}

impl Default for OverlapAccident {
    fn default() -> Self {
        Self::new(Overlay::new(), Self::DEFAULT_THRESHOLD)
    }
}

/// True when some unordered pair overlaps by strictly more than `threshold`.
///
/// Every pair is visited even after a hit.
pub fn detect_overlap(vehicles: &[Detection], threshold: i64) -> bool {
    let mut detected = false;
    for (i, a) in vehicles.iter().enumerate() {
        for b in &vehicles[i + 1..] {
            if a.bbox.overlap_area(&b.bbox) > threshold {
                detected = true;
            }
        }
    }
    detected
}

impl MetricStrategy for OverlapAccident {
    type Metrics = AccidentState;

    fn kind(&self) -> PipelineKind {
        PipelineKind::Accident
    }

    fn compute(&self, mut frame: Frame, vehicles: &[Detection]) -> (Frame, AccidentState) {
        for vehicle in vehicles {
            self.overlay.mark_vehicle(&mut frame, &vehicle.bbox);
        }

        let accident_detected = detect_overlap(vehicles, self.threshold);
        if accident_detected {
            self.overlay.banner(&mut frame, ACCIDENT_CAPTION);
        }

        (frame, AccidentState { accident_detected })
    }
}
