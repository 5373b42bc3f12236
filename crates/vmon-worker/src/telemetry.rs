//! Metric names recorded by the pipelines.
//!
//! Recording is a no-op until the binary installs a recorder.

pub const FRAMES_PROCESSED_TOTAL: &str = "vmon_frames_processed_total";
pub const DETECTOR_FAILURES_TOTAL: &str = "vmon_detector_failures_total";
pub const SOURCE_RESTARTS_TOTAL: &str = "vmon_source_restarts_total";
pub const STREAM_CLIENTS_ACTIVE: &str = "vmon_stream_clients_active";
pub const WORKERS_ACTIVE: &str = "vmon_workers_active";
