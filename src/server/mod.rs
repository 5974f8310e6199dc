//! Prediction web service
//!
//! HTML form and JSON prediction routes over the deployed bundle, plus a
//! `/train` route that runs the full training pipeline.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use handlers::{render_page, TRAINING_SUCCESS};
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use crate::cloud::S3ModelStorage;
use crate::config::constants::{APP_HOST, APP_PORT};
use crate::config::PipelineConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| APP_HOST.to_string()),
            port: std::env::var("APP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(APP_PORT),
        }
    }
}

/// Serve with S3 model storage until ctrl+c
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let pipeline = PipelineConfig::default();
    let storage = Arc::new(S3ModelStorage::from_env(&pipeline.aws_region)?);
    let state = AppState::new(config, pipeline, storage);
    serve(Arc::new(state)).await
}

/// Serve an already assembled state until ctrl+c
pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    let addr: SocketAddr = format!("{}:{}", state.config.host, state.config.port).parse()?;
    let app = create_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        address = %addr,
        bucket = %state.pipeline.model_bucket,
        pid = std::process::id(),
        started_at = %start_time.to_rfc3339(),
        "Churn prediction server listening"
    );

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received, stopping server gracefully");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
