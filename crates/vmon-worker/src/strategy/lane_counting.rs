use vmon_media::{Frame, Overlay};
use vmon_models::{Detection, LaneMetrics, PipelineKind};

use super::MetricStrategy;

/// Splits the frame into two vertical lanes at `width / 2` and derives
/// green-light timing from the per-lane vehicle share.
#[derive(Clone, Default)]
pub struct LaneCounting {
    overlay: Overlay,
}

impl LaneCounting {
    pub fn new(overlay: Overlay) -> Self {
        Self { overlay }
    }
}

/// Count vehicles per lane. A box whose horizontal center lies left of the
/// midline is lane A, anything else (including exactly on it) is lane B.
pub fn count_lanes(vehicles: &[Detection], width: u32) -> (u32, u32) {
    let mid = (width / 2) as f64;
    vehicles.iter().fold((0, 0), |(a, b), v| {
        if v.bbox.center_x() < mid {
            (a + 1, b)
        } else {
            (a, b + 1)
        }
    })
}

impl MetricStrategy for LaneCounting {
    type Metrics = LaneMetrics;

    fn kind(&self) -> PipelineKind {
        PipelineKind::Traffic
    }

    fn compute(&self, mut frame: Frame, vehicles: &[Detection]) -> (Frame, LaneMetrics) {
        let width = frame.width();
        let (count_a, count_b) = count_lanes(vehicles, width);

        for vehicle in vehicles {
            self.overlay.mark_vehicle(&mut frame, &vehicle.bbox);
        }
        self.overlay.lane_divider(&mut frame, width / 2);
        self.overlay
            .caption(&mut frame, 10, 10, &format!("Lane A: {}", count_a));
        self.overlay.caption(
            &mut frame,
            (width / 2) as i32 + 10,
            10,
            &format!("Lane B: {}", count_b),
        );

        (frame, LaneMetrics::from_counts(count_a, count_b))
    }
}
