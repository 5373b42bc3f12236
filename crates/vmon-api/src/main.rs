//! Axum API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vmon_api::{create_router, metrics, ApiConfig, AppState};
use vmon_worker::{Pipelines, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env();

    // Colored output for dev, JSON for production unless LOG_FORMAT says otherwise
    let use_json = match std::env::var("LOG_FORMAT") {
        Ok(format) => format.to_lowercase() == "json",
        Err(_) => config.is_production(),
    };

    let env_filter = EnvFilter::from_default_env()
        .add_directive("vmon=info".parse()?)
        .add_directive("ort=warn".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_names(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting vmon-api");

    let worker_config = WorkerConfig::from_env();
    info!("API config: host={}, port={}", config.host, config.port);
    info!(
        traffic = %worker_config.traffic_video_path.display(),
        accident = %worker_config.accident_video_path.display(),
        webcam = worker_config.webcam_index,
        model = %worker_config.detector_model_path.display(),
        "Pipeline config"
    );

    // Load the detector and build both pipelines
    let state = AppState::new(config.clone(), worker_config)
        .context("failed to initialise pipelines")?;
    let pipelines = Arc::clone(&state.pipelines);

    let metrics_handle = if config.metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => {
                info!("Prometheus metrics enabled at /metrics");
                Some(handle)
            }
            Err(e) => {
                warn!("Prometheus recorder not installed: {}", e);
                None
            }
        }
    } else {
        None
    };

    // Create router
    let app = create_router(state, metrics_handle);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid bind address")?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&pipelines)))
        .await
        .context("server error")?;

    pipelines.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal(pipelines: Arc<Pipelines>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
    // Open MJPEG responses never finish on their own
    pipelines.close_streams();
}
