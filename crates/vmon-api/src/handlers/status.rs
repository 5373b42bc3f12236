//! Pipeline lifecycle status.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use vmon_models::PipelineStatus;

use crate::state::AppState;

#[derive(Serialize)]
pub struct StatusResponse {
    pub pipelines: Vec<PipelineStatus>,
}

pub async fn pipeline_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        pipelines: state.pipelines.status().await,
    })
}
