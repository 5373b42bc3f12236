//! Axum HTTP API server.
//!
//! This crate provides:
//! - Start/stop control for the traffic and accident pipelines
//! - Read-only metrics endpoints and per-client MJPEG streams
//! - Health, status and Prometheus metrics endpoints

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
