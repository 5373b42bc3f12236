//! Request handlers.

pub mod accident;
pub mod health;
pub mod status;
pub mod traffic;

pub use accident::*;
pub use health::*;
pub use status::*;
pub use traffic::*;

use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use vmon_models::SourceSpec;
use vmon_worker::{StreamPublisher, MJPEG_CONTENT_TYPE};

use crate::error::{ApiError, ApiResult};

/// Body of a start request.
#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub source: Option<String>,
}

/// Acknowledgement for control requests.
#[derive(Debug, Serialize, Deserialize)]
pub struct ControlResponse {
    pub message: String,
}

impl ControlResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Validate the requested source. Runs before any pipeline is touched.
pub(crate) fn parse_source(request: Option<Json<StartRequest>>) -> ApiResult<SourceSpec> {
    let source = request
        .and_then(|Json(body)| body.source)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Video source not provided"))?;

    source
        .parse()
        .map_err(|e: vmon_models::SourceSpecParseError| ApiError::bad_request(e.to_string()))
}

/// Streaming `multipart/x-mixed-replace` response for one client.
pub(crate) fn mjpeg_response<M>(publisher: StreamPublisher<M>) -> Response
where
    M: Clone + Default + Send + Sync + 'static,
{
    (
        [
            (header::CONTENT_TYPE, MJPEG_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache, no-store"),
        ],
        Body::from_stream(publisher.into_stream()),
    )
        .into_response()
}
