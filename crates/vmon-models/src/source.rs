//! Video source specifiers accepted by the control surface.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Closed set of sources a pipeline can be started with.
///
/// The concrete file path or device index behind each variant is
/// deployment configuration, not part of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSpec {
    /// Fixed traffic recording.
    Prerecorded,
    /// Local camera.
    Webcam,
    /// Fixed accident recording.
    PrerecordedAccident,
}

impl SourceSpec {
    pub const ALL: &'static [SourceSpec] = &[
        SourceSpec::Prerecorded,
        SourceSpec::Webcam,
        SourceSpec::PrerecordedAccident,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceSpec::Prerecorded => "prerecorded",
            SourceSpec::Webcam => "webcam",
            SourceSpec::PrerecordedAccident => "prerecorded_accident",
        }
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourceSpec {
    type Err = SourceSpecParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prerecorded" => Ok(SourceSpec::Prerecorded),
            "webcam" => Ok(SourceSpec::Webcam),
            "prerecorded_accident" => Ok(SourceSpec::PrerecordedAccident),
            _ => Err(SourceSpecParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown video source: {0}")]
pub struct SourceSpecParseError(pub String);
