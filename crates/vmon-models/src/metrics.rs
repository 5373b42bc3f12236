//! Metrics published by the analysis pipelines.
//!
//! Field names on the wire match what the dashboard polls:
//! `{"lane_A": {...}, "lane_B": {...}, "total_vehicles": n}` for traffic and
//! `{"accident_detected": bool}` for accidents.

use serde::{Deserialize, Serialize};

/// Shortest green-light duration handed to a lane, in seconds.
pub const MIN_GREEN_SECS: u32 = 10;
/// Longest green-light duration handed to a lane, in seconds.
pub const MAX_GREEN_SECS: u32 = 60;

/// Vehicle count and derived green-light time for one lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LaneStatus {
    pub vehicle_count: u32,
    pub green_light_duration: u32,
}

/// Lane-split vehicle counts with derived traffic-light timing.
///
/// `Default` is the reset baseline: every field zero. Values built with
/// [`LaneMetrics::from_counts`] always carry durations in
/// `[MIN_GREEN_SECS, MAX_GREEN_SECS]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LaneMetrics {
    #[serde(rename = "lane_A")]
    pub lane_a: LaneStatus,
    #[serde(rename = "lane_B")]
    pub lane_b: LaneStatus,
    pub total_vehicles: u32,
}

impl LaneMetrics {
    /// Derive timing from per-lane counts.
    ///
    /// Each lane gets `floor(MIN + ratio * (MAX - MIN))` where `ratio` is its
    /// share of the total. With no vehicles both lanes get `MIN`.
    pub fn from_counts(count_a: u32, count_b: u32) -> Self {
        let total = count_a + count_b;
        Self {
            lane_a: LaneStatus {
                vehicle_count: count_a,
                green_light_duration: green_light_duration(count_a, total),
            },
            lane_b: LaneStatus {
                vehicle_count: count_b,
                green_light_duration: green_light_duration(count_b, total),
            },
            total_vehicles: total,
        }
    }
}

/// Integer form of `floor(MIN + count / total * (MAX - MIN))`.
fn green_light_duration(count: u32, total: u32) -> u32 {
    if total == 0 {
        return MIN_GREEN_SECS;
    }
    let span = (MAX_GREEN_SECS - MIN_GREEN_SECS) as u64;
    MIN_GREEN_SECS + (count as u64 * span / total as u64) as u32
}

/// Per-frame accident verdict. No history is retained between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccidentState {
    pub accident_detected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_frame_uses_floor() {
        let m = LaneMetrics::from_counts(0, 0);
        assert_eq!(m.lane_a.green_light_duration, 10);
        assert_eq!(m.lane_b.green_light_duration, 10);
        assert_eq!(m.total_vehicles, 0);
    }

    #[test]
    fn test_three_to_one_split() {
        let m = LaneMetrics::from_counts(3, 1);
        assert_eq!(m.lane_a.vehicle_count, 3);
        assert_eq!(m.lane_b.vehicle_count, 1);
        assert_eq!(m.lane_a.green_light_duration, 47);
        assert_eq!(m.lane_b.green_light_duration, 22);
        assert_eq!(m.total_vehicles, 4);
    }

    #[test]
    fn test_single_lane_gets_max() {
        let m = LaneMetrics::from_counts(5, 0);
        assert_eq!(m.lane_a.green_light_duration, 60);
        assert_eq!(m.lane_b.green_light_duration, 10);
    }

    #[test]
    fn test_durations_always_bounded() {
        for a in 0..40 {
            for b in 0..40 {
                let m = LaneMetrics::from_counts(a, b);
                for d in [m.lane_a.green_light_duration, m.lane_b.green_light_duration] {
                    assert!((MIN_GREEN_SECS..=MAX_GREEN_SECS).contains(&d), "{a}/{b} -> {d}");
                }
                assert_eq!(m.total_vehicles, a + b);
            }
        }
        let m = LaneMetrics::from_counts(u32::MAX / 2, u32::MAX / 2);
        assert_eq!(m.lane_a.green_light_duration, 35);
    }

    #[test]
    fn test_baseline_is_zeroed() {
        let m = LaneMetrics::default();
        assert_eq!(m.total_vehicles, 0);
        assert_eq!(m.lane_a, LaneStatus::default());
        assert_eq!(m.lane_b.green_light_duration, 0);
    }

    #[test]
    fn test_lane_metrics_wire_shape() {
        let json = serde_json::to_value(LaneMetrics::from_counts(3, 1)).unwrap();
        assert_eq!(json["lane_A"]["vehicle_count"], 3);
        assert_eq!(json["lane_A"]["green_light_duration"], 47);
        assert_eq!(json["lane_B"]["green_light_duration"], 22);
        assert_eq!(json["total_vehicles"], 4);
    }

    #[test]
    fn test_accident_wire_shape() {
        let json = serde_json::to_string(&AccidentState { accident_detected: true }).unwrap();
        assert_eq!(json, r#"{"accident_detected":true}"#);
    }
}
