//! Shared data models for the vmon backend.
//!
//! This crate provides Serde-serializable types for:
//! - Detector output (bounding boxes, vehicle filtering)
//! - Per-pipeline metrics (lane timing, accident state)
//! - Source specifiers accepted by the control surface
//! - Pipeline lifecycle and status reporting

pub mod detection;
pub mod lifecycle;
pub mod metrics;
pub mod source;

// Re-export common types
pub use detection::{filter_vehicles, BBox, Detection, VEHICLE_CLASS_IDS};
pub use lifecycle::{PipelineKind, PipelineState, PipelineStatus};
pub use metrics::{AccidentState, LaneMetrics, LaneStatus, MAX_GREEN_SECS, MIN_GREEN_SECS};
pub use source::{SourceSpec, SourceSpecParseError};
