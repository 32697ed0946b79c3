//! Storage Layout
//!
//! Resolves the platform directories and the on-disk dataset layout:
//! a sample dataset directory, a directory of uploaded datasets, and a
//! cache directory for downloaded model files. Every dataset directory
//! contains images plus one `labels.txt` manifest.

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Filename of the label manifest inside every dataset directory
pub const LABELS_FILE: &str = "labels.txt";

/// Get the application data directory
pub fn get_data_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "cashea", "OcrBench")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

    let data_dir = proj_dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)?;

    Ok(data_dir)
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "cashea", "OcrBench")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// True if the directory holds a usable dataset (has a label manifest)
pub fn is_dataset_dir(dir: &Path) -> bool {
    dir.is_dir() && dir.join(LABELS_FILE).is_file()
}

/// Reduce a client-supplied filename to its final path component.
///
/// Returns None for empty names and hidden files, which also covers
/// traversal attempts like `../../etc/passwd` (reduced to `passwd`).
pub fn sanitize_filename(name: &str) -> Option<String> {
    let safe = Path::new(name).file_name()?.to_str()?;
    if safe.is_empty() || safe.starts_with('.') {
        return None;
    }
    Some(safe.to_string())
}

/// True if the filename carries an accepted image extension
pub fn is_image_filename(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".jpg") || lower.ends_with(".jpeg") || lower.ends_with(".png")
}
