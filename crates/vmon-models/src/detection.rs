//! Detector output types.

use serde::{Deserialize, Serialize};

/// COCO class ids treated as vehicles: car, motorcycle, bus, truck.
pub const VEHICLE_CLASS_IDS: [u32; 4] = [2, 3, 5, 7];

/// Axis-aligned bounding box in pixel coordinates.
///
/// `(x1, y1)` is the top-left corner and `(x2, y2)` the bottom-right one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        (self.x2 - self.x1).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y2 - self.y1).max(0)
    }

    /// Horizontal center of the box.
    pub fn center_x(&self) -> f64 {
        (self.x1 as f64 + self.x2 as f64) / 2.0
    }

    /// Area of the axis-aligned intersection with `other`, zero when disjoint.
    pub fn overlap_area(&self, other: &BBox) -> i64 {
        let w = (self.x2.min(other.x2) as i64 - self.x1.max(other.x1) as i64).max(0);
        let h = (self.y2.min(other.y2) as i64 - self.y1.max(other.y1) as i64).max(0);
        w * h
    }
}

/// A single object reported by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// COCO class id (2 = car, 7 = truck, ...)
    pub class_id: u32,
    pub bbox: BBox,
    /// Detector confidence in [0, 1]
    #[serde(default)]
    pub confidence: f32,
}

impl Detection {
    pub fn new(class_id: u32, bbox: BBox) -> Self {
        Self {
            class_id,
            bbox,
            confidence: 1.0,
        }
    }

    /// Check whether the detection belongs to the vehicle class set.
    pub fn is_vehicle(&self) -> bool {
        VEHICLE_CLASS_IDS.contains(&self.class_id)
    }
}

/// Keep only vehicle detections, preserving detector order.
pub fn filter_vehicles(detections: Vec<Detection>) -> Vec<Detection> {
    detections.into_iter().filter(Detection::is_vehicle).collect()
}
