//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    accident_data, accident_video_feed, health, pipeline_status, start_accident_detection,
    start_analysis, stop_accident_detection, stop_analysis, traffic_data, video_feed,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let traffic_routes = Router::new()
        .route("/start-analysis", post(start_analysis))
        .route("/stop-analysis", post(stop_analysis))
        .route("/traffic-data", get(traffic_data));

    let accident_routes = Router::new()
        .route("/start-accident-detection", post(start_accident_detection))
        .route("/stop-accident-detection", post(stop_accident_detection))
        .route("/accident-data", get(accident_data));

    let api_routes = Router::new()
        .merge(traffic_routes)
        .merge(accident_routes)
        .route("/status", get(pipeline_status));

    // Paths kept at the root for existing dashboard `<img>` tags
    let stream_routes = Router::new()
        .route("/video_feed", get(video_feed))
        .route("/accident_video_feed", get(accident_video_feed));

    let health_routes = Router::new().route("/health", get(health));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(stream_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
