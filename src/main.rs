//! OCR Bench server binary
//!
//! Serves the browser UI and the JSON API. Run with `--mock` to
//! fabricate OCR results instead of downloading and running models.

use anyhow::Result;
use clap::Parser;
use ocr_bench::config::{self, AppConfig};
use ocr_bench::job::JobTracker;
use ocr_bench::server::{self, AppState};
use ocr_bench::storage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// OCR Bench - OCR evaluation web app
#[derive(Parser, Debug)]
#[command(name = "ocr-bench")]
#[command(about = "Web playground for evaluating a pretrained OCR pipeline")]
struct Args {
    /// Bind address override
    #[arg(long)]
    host: Option<String>,

    /// Port override
    #[arg(short, long)]
    port: Option<u16>,

    /// Fabricate OCR results instead of running models
    #[arg(long)]
    mock: bool,

    /// Configuration file override
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = load_or_create_config(args.config.as_deref());
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    info!("OCR Bench starting...");
    if args.mock {
        info!("Mock mode: OCR results will be fabricated, no models are loaded");
    }

    match config.sample_dataset_dir() {
        Ok(dir) if storage::is_dataset_dir(&dir) => info!("Sample dataset at {:?}", dir),
        Ok(dir) => warn!(
            "No sample dataset at {:?}; run the gen-dataset binary to create one",
            dir
        ),
        Err(e) => warn!("Could not resolve sample dataset directory: {e:#}"),
    }

    let state = Arc::new(AppState {
        tracker: JobTracker::new(),
        config,
        mock: args.mock,
    });

    server::serve(state).await
}

/// Load configuration from file or create default
fn load_or_create_config(override_path: Option<&Path>) -> AppConfig {
    if let Some(path) = override_path {
        match config::load_config(path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", path);
                return config;
            }
            Err(e) => warn!("Failed to load {:?}: {e:#}; using defaults", path),
        }
        return AppConfig::default();
    }

    if let Ok(config_dir) = storage::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            if let Ok(config) = config::load_config(&config_path) {
                info!("Loaded configuration from {:?}", config_path);
                return config;
            }
        }
    }

    info!("Using default configuration");
    AppConfig::default()
}
