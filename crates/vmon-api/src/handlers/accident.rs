//! Accident pipeline handlers.

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use tracing::info;
use vmon_models::AccidentState;

use super::{mjpeg_response, parse_source, ControlResponse, StartRequest};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn start_accident_detection(
    State(state): State<AppState>,
    request: Option<Json<StartRequest>>,
) -> ApiResult<Json<ControlResponse>> {
    let source = parse_source(request)?;
    state.pipelines.accident.start(source).await?;

    info!(source = %source, "Accident detection started");
    Ok(ControlResponse::new(format!(
        "Accident detection started with source: {}",
        source
    )))
}

pub async fn stop_accident_detection(State(state): State<AppState>) -> Json<ControlResponse> {
    state.pipelines.accident.stop().await;
    ControlResponse::new("Accident detection stopped")
}

/// Verdict for the most recently processed frame.
pub async fn accident_data(State(state): State<AppState>) -> Json<AccidentState> {
    Json(state.pipelines.accident.reader().read())
}

pub async fn accident_video_feed(State(state): State<AppState>) -> Response {
    mjpeg_response(state.pipelines.accident_stream())
}
