//! Application state.

use std::sync::Arc;

use vmon_worker::{Pipelines, WorkerConfig, WorkerResult};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipelines: Arc<Pipelines>,
}

impl AppState {
    /// Create application state with the production detector and sources.
    pub fn new(config: ApiConfig, worker_config: WorkerConfig) -> WorkerResult<Self> {
        let pipelines = Pipelines::from_config(worker_config)?;
        Ok(Self::with_pipelines(config, Arc::new(pipelines)))
    }

    pub fn with_pipelines(config: ApiConfig, pipelines: Arc<Pipelines>) -> Self {
        Self { config, pipelines }
    }
}
