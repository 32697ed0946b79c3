//! Dataset handling
//!
//! A dataset is a directory of images plus one `labels.txt` manifest:
//! newline-separated records of `filename<TAB>expected text`, UTF-8.
//! Upload validation is strict (one malformed line rejects the whole
//! manifest, naming the 1-indexed line); reading is lenient (blank and
//! tab-less lines are silently skipped).

pub mod generator;

use crate::storage::{is_dataset_dir, LABELS_FILE};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// One record of the label manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Image filename, relative to the dataset directory
    pub filename: String,
    /// Expected text for the image
    pub text: String,
}

/// Strict-validation failure for an uploaded manifest
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("Invalid labels format at line {line}. Expected: filename<TAB>text")]
    MissingTab { line: usize },
}

/// Parse a manifest leniently, skipping blank and tab-less lines.
///
/// Each kept line is split at its first tab; the part before it is the
/// filename, everything after it the expected text.
pub fn parse_manifest(content: &str) -> Vec<ManifestEntry> {
    let mut entries = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((filename, text)) = line.split_once('\t') {
            entries.push(ManifestEntry {
                filename: filename.to_string(),
                text: text.to_string(),
            });
        }
    }

    entries
}

/// Read and leniently parse the manifest of a dataset directory
pub fn read_manifest(dataset_dir: &Path) -> Result<Vec<ManifestEntry>> {
    let path = dataset_dir.join(LABELS_FILE);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read manifest {:?}", path))?;

    let entries = parse_manifest(&content);
    debug!("Read {} manifest entries from {:?}", entries.len(), path);

    Ok(entries)
}

/// Strictly validate manifest text at upload time.
///
/// Every non-blank line must contain a tab separator. Line numbers in
/// the error count non-blank lines only, 1-indexed. Returns the number
/// of records on success.
pub fn validate_manifest(content: &str) -> Result<usize, ManifestError> {
    let lines: Vec<&str> = content
        .trim()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();

    for (i, line) in lines.iter().enumerate() {
        if !line.contains('\t') {
            return Err(ManifestError::MissingTab { line: i + 1 });
        }
    }

    Ok(lines.len())
}

/// Count the non-blank lines of a dataset's manifest
pub fn count_manifest_lines(dataset_dir: &Path) -> Result<usize> {
    let path = dataset_dir.join(LABELS_FILE);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read manifest {:?}", path))?;

    Ok(content.lines().filter(|line| !line.trim().is_empty()).count())
}

/// Origin of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Sample,
    Uploaded,
}

/// A dataset visible to the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DatasetKind,
    pub path: PathBuf,
    pub image_count: usize,
}

/// List the sample dataset (if present) followed by uploaded datasets
pub fn list_datasets(sample_dir: &Path, uploads_dir: &Path) -> Result<Vec<DatasetInfo>> {
    let mut datasets = Vec::new();

    if is_dataset_dir(sample_dir) {
        datasets.push(DatasetInfo {
            name: "Sample Dataset".to_string(),
            kind: DatasetKind::Sample,
            path: sample_dir.to_path_buf(),
            image_count: count_manifest_lines(sample_dir)?,
        });
    }

    if uploads_dir.is_dir() {
        let mut uploaded = Vec::new();
        for entry in std::fs::read_dir(uploads_dir)? {
            let entry = entry?;
            let path = entry.path();
            if is_dataset_dir(&path) {
                uploaded.push(DatasetInfo {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    kind: DatasetKind::Uploaded,
                    path: path.clone(),
                    image_count: count_manifest_lines(&path)?,
                });
            }
        }
        // read_dir order is platform dependent
        uploaded.sort_by(|a, b| a.name.cmp(&b.name));
        datasets.extend(uploaded);
    }

    Ok(datasets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_entry() {
        let entries = parse_manifest("img1.jpg\tHello\n");
        assert_eq!(
            entries,
            vec![ManifestEntry {
                filename: "img1.jpg".to_string(),
                text: "Hello".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_splits_at_first_tab_only() {
        let entries = parse_manifest("img1.jpg\tHello\tWorld\n");
        assert_eq!(entries[0].filename, "img1.jpg");
        assert_eq!(entries[0].text, "Hello\tWorld");
    }

    #[test]
    fn test_parse_skips_blank_and_tabless_lines() {
        let content = "img1.jpg\tHello\n\nno tab here\nimg2.jpg\tWorld\n\n";
        let entries = parse_manifest(content);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].filename, "img2.jpg");
    }

    #[test]
    fn test_validate_accepts_well_formed_manifest() {
        let content = "img1.jpg\tHello\nimg2.jpg\tWorld\n\n";
        assert_eq!(validate_manifest(content), Ok(2));
    }

    #[test]
    fn test_validate_reports_offending_line() {
        let content = "img1.jpg\tHello\nbroken line\nimg3.jpg\tWorld\n";
        assert_eq!(
            validate_manifest(content),
            Err(ManifestError::MissingTab { line: 2 })
        );
    }

    #[test]
    fn test_validate_line_numbers_skip_blanks() {
        // Line numbering counts non-blank lines only, matching the
        // strict checker's view of the manifest.
        let content = "\nimg1.jpg\tHello\n\nbroken line\n";
        assert_eq!(
            validate_manifest(content),
            Err(ManifestError::MissingTab { line: 2 })
        );
    }

    #[test]
    fn test_strict_and_lenient_disagree_on_same_input() {
        // A tab-less line fails upload validation but is silently
        // skipped by the lenient reader.
        let content = "img1.jpg\tHello\nbroken line\n";
        assert!(validate_manifest(content).is_err());
        assert_eq!(parse_manifest(content).len(), 1);
    }

    #[test]
    fn test_read_manifest_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(LABELS_FILE),
            "a.jpg\tfirst\nb.jpg\tsecond\n",
        )
        .unwrap();

        let entries = read_manifest(dir.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "first");
    }

    #[test]
    fn test_read_manifest_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_manifest(dir.path()).is_err());
    }

    #[test]
    fn test_list_datasets() {
        let root = tempfile::tempdir().unwrap();
        let sample = root.path().join("sample");
        let uploads = root.path().join("uploads");
        std::fs::create_dir_all(&sample).unwrap();
        std::fs::create_dir_all(uploads.join("dataset_20240101_120000")).unwrap();

        std::fs::write(sample.join(LABELS_FILE), "a.jpg\tA\nb.jpg\tB\n").unwrap();
        std::fs::write(
            uploads.join("dataset_20240101_120000").join(LABELS_FILE),
            "c.jpg\tC\n",
        )
        .unwrap();
        // A directory without a manifest is not a dataset
        std::fs::create_dir_all(uploads.join("not_a_dataset")).unwrap();

        let datasets = list_datasets(&sample, &uploads).unwrap();
        assert_eq!(datasets.len(), 2);
        assert_eq!(datasets[0].kind, DatasetKind::Sample);
        assert_eq!(datasets[0].image_count, 2);
        assert_eq!(datasets[1].name, "dataset_20240101_120000");
        assert_eq!(datasets[1].image_count, 1);
    }
}
