//! Pipeline identity and lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::source::SourceSpec;

/// The two independent analysis pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    Traffic,
    Accident,
}

impl PipelineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::Traffic => "traffic",
            PipelineKind::Accident => "accident",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Controller lifecycle. `Idle` is the initial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Idle,
    Running,
}

impl PipelineState {
    pub fn is_running(&self) -> bool {
        matches!(self, PipelineState::Running)
    }
}

/// Point-in-time view of one pipeline controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub pipeline: PipelineKind,
    pub state: PipelineState,
    /// Source of the most recent `start`, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceSpec>,
    /// Whether a worker thread is still executing. A running pipeline whose
    /// source failed to open reports `false` here.
    pub worker_alive: bool,
}
