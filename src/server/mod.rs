//! HTTP surface
//!
//! Translates requests into Job Tracker and dataset-layer calls and
//! serializes status for polling clients. The browser UI is one
//! embedded page served at the root.

pub mod error;
mod routes;

pub use error::ApiError;

use crate::config::AppConfig;
use crate::job::JobTracker;
use crate::ocr::EngineOptions;
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tracing::info;

/// Cap for a whole multipart upload body (per-file limits apply on top)
const MAX_BODY_BYTES: usize = 1024 * 1024 * 1024;

/// State shared by all handlers
pub struct AppState {
    pub tracker: JobTracker,
    pub config: AppConfig,
    /// Fabricate OCR results instead of running models
    pub mock: bool,
}

impl AppState {
    /// Engine selection for jobs and detect requests
    pub fn engine_options(&self) -> Result<EngineOptions> {
        Ok(EngineOptions {
            mock: self.mock,
            mock_error_rate: self.config.ocr.mock_error_rate,
            models_dir: self.config.models_dir()?,
        })
    }
}

pub type SharedState = Arc<AppState>;

/// Build the application router
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(routes::ui))
        .route("/health", get(routes::health))
        .route("/datasets", get(routes::list_datasets))
        .route("/datasets/upload", post(routes::upload_dataset))
        .route("/datasets/sample", get(routes::sample_dataset_info))
        .route(
            "/datasets/sample/images/{filename}",
            get(routes::sample_image),
        )
        .route("/jobs", post(routes::submit_job))
        .route("/jobs/status", get(routes::job_status))
        .route("/jobs/reset", post(routes::reset_job))
        .route("/detect", post(routes::detect))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Bind and serve until the process exits
pub async fn serve(state: SharedState) -> Result<()> {
    let address = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;

    info!("Listening on http://{address}");

    axum::serve(listener, router(state))
        .await
        .context("Server error")?;

    Ok(())
}
