//! Sample dataset generator
//!
//! Renders the canonical sample texts onto small images and writes the
//! matching `labels.txt`, so the server has a dataset to evaluate out
//! of the box.

use anyhow::Result;
use clap::Parser;
use ocr_bench::config::AppConfig;
use ocr_bench::dataset::generator::{self, DEFAULT_FONT_PATH};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Generate the sample OCR dataset
#[derive(Parser, Debug)]
#[command(name = "gen-dataset")]
#[command(about = "Generate the sample OCR dataset (images plus labels.txt)")]
struct Args {
    /// Output directory (defaults to the configured sample dataset dir)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TTF font used for rendering
    #[arg(long, default_value = DEFAULT_FONT_PATH)]
    font: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let output = match args.output {
        Some(dir) => dir,
        None => AppConfig::default().sample_dataset_dir()?,
    };

    let font = generator::load_font(&args.font)?;
    let count = generator::generate_dataset(&output, &font)?;

    info!("Generated {count} samples at {:?}", output);
    info!("Start the server and pick \"Sample Dataset\" to evaluate it");

    Ok(())
}
