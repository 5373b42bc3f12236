//! Analysis pipeline workers.
//!
//! This crate provides:
//! - `SharedState`: generation-stamped latest frame + metrics per pipeline
//! - `MetricsReader`: read-only copies of a pipeline's metrics
//! - Metric strategies: lane counting and overlap accident detection
//! - `PipelineWorker`: capture → detect → compute → publish loop on its own thread
//! - `PipelineController`: start/stop lifecycle with bounded worker hand-over
//! - `StreamPublisher`: per-client MJPEG chunk stream over the shared state

pub mod cancel;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod pipelines;
pub mod publisher;
pub mod shared_state;
pub mod strategy;
pub mod telemetry;
pub mod worker;

pub use cancel::CancellationToken;
pub use config::WorkerConfig;
pub use controller::{PipelineController, PipelineDeps};
pub use error::{WorkerError, WorkerResult};
pub use logging::PipelineLogger;
pub use pipelines::Pipelines;
pub use publisher::{wrap_part, StreamPublisher, MJPEG_BOUNDARY, MJPEG_CONTENT_TYPE};
pub use shared_state::{Generation, MetricsReader, SharedState, Snapshot};
pub use strategy::{
    count_lanes, detect_overlap, LaneCounting, MetricStrategy, OverlapAccident, ACCIDENT_CAPTION,
};
pub use worker::{PipelineWorker, WorkerExit};
