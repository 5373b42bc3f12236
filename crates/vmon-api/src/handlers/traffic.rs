//! Traffic pipeline handlers.

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use tracing::info;
use vmon_models::LaneMetrics;

use super::{mjpeg_response, parse_source, ControlResponse, StartRequest};
use crate::error::ApiResult;
use crate::state::AppState;

/// Start (or restart) lane counting on the requested source.
pub async fn start_analysis(
    State(state): State<AppState>,
    request: Option<Json<StartRequest>>,
) -> ApiResult<Json<ControlResponse>> {
    let source = parse_source(request)?;
    state.pipelines.traffic.start(source).await?;

    info!(source = %source, "Traffic analysis started");
    Ok(ControlResponse::new(format!(
        "Analysis started with source: {}",
        source
    )))
}

pub async fn stop_analysis(State(state): State<AppState>) -> Json<ControlResponse> {
    state.pipelines.traffic.stop().await;
    ControlResponse::new("Analysis stopped")
}

/// Latest lane counts and green-light durations.
pub async fn traffic_data(State(state): State<AppState>) -> Json<LaneMetrics> {
    Json(state.pipelines.traffic.reader().read())
}

pub async fn video_feed(State(state): State<AppState>) -> Response {
    mjpeg_response(state.pipelines.traffic_stream())
}
