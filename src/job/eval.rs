//! Background evaluation task
//!
//! Runs OCR inference over every manifest sample of a dataset and
//! compares the recognized text against ground truth. All failures are
//! absorbed at the task boundary and turned into the Failed state; a
//! job must never take the process down with it.

use crate::config::EvaluationConfig;
use crate::dataset;
use crate::job::status::{EvaluationReport, SampleOutcome};
use crate::job::JobHandle;
use crate::ocr::{self, EngineOptions};
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Cooperative delays of the demo loop
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    /// Pause between pipeline stages
    pub stage_delay: Duration,
    /// Pause after each processed sample
    pub sample_delay: Duration,
}

impl Pacing {
    pub fn from_config(config: &EvaluationConfig) -> Self {
        Self {
            stage_delay: Duration::from_millis(config.stage_delay_ms),
            sample_delay: Duration::from_millis(config.sample_delay_ms),
        }
    }

    /// No delays; used by tests
    pub fn none() -> Self {
        Self {
            stage_delay: Duration::ZERO,
            sample_delay: Duration::ZERO,
        }
    }
}

/// Task body: evaluate and finalize the status record.
///
/// Writes go through the generation-tagged handle, so a job that was
/// superseded by a reset finishes silently instead of resurrecting the
/// shared record.
pub(crate) async fn run(
    handle: JobHandle,
    dataset_dir: PathBuf,
    languages: Vec<String>,
    use_accelerator: bool,
    engine: EngineOptions,
    pacing: Pacing,
) {
    match evaluate(
        &handle,
        &dataset_dir,
        &languages,
        use_accelerator,
        &engine,
        pacing,
    )
    .await
    {
        Ok(report) => {
            info!(
                "Training finished: {}/{} correct ({}%)",
                report.correct_predictions, report.total_samples, report.accuracy
            );
            if !handle.complete(report) {
                debug!("Discarding completion of a superseded job");
            }
        }
        Err(e) => {
            warn!("Training job failed: {e:#}");
            if !handle.fail(format!("Training failed: {e}")) {
                debug!("Discarding failure of a superseded job");
            }
        }
    }
}

async fn evaluate(
    handle: &JobHandle,
    dataset_dir: &Path,
    languages: &[String],
    use_accelerator: bool,
    engine: &EngineOptions,
    pacing: Pacing,
) -> Result<EvaluationReport> {
    handle.progress(10, "Initializing OCR model...");
    let reader = ocr::prepare_reader(engine, languages, use_accelerator, Some(dataset_dir)).await?;
    sleep(pacing.stage_delay).await;

    handle.progress(20, "Loading dataset...");
    let samples = dataset::read_manifest(dataset_dir).context("Failed to load dataset")?;
    sleep(pacing.stage_delay).await;

    let total = samples.len();
    let mut outcomes = Vec::new();

    for (i, entry) in samples.iter().enumerate() {
        let image_path = dataset_dir.join(&entry.filename);

        if image_path.is_file() {
            // Inference is CPU-bound; keep it off the async workers
            let predicted = {
                let reader = reader.clone();
                let path = image_path.clone();
                tokio::task::spawn_blocking(move || reader.full_text(&path))
                    .await
                    .map_err(|e| anyhow!("OCR task panicked: {e}"))??
            };

            let correct = predictions_match(&predicted, &entry.text);
            outcomes.push(SampleOutcome {
                filename: entry.filename.clone(),
                ground_truth: entry.text.clone(),
                predicted,
                correct,
            });
        } else {
            // Missing images drop out of the totals and the detail list
            debug!("Skipping missing image {:?}", image_path);
        }

        let progress = 20 + (((i + 1) * 70) / total.max(1)) as u8;
        handle.progress(progress, format!("Processing image {}/{}", i + 1, total));

        sleep(pacing.sample_delay).await;
    }

    Ok(EvaluationReport::from_outcomes(outcomes))
}

/// Case-insensitive, whitespace-trimmed exact match
pub fn predictions_match(predicted: &str, expected: &str) -> bool {
    predicted.trim().to_lowercase() == expected.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(predictions_match("Hello World", "Hello World"));
    }

    #[test]
    fn test_match_ignores_case_and_outer_whitespace() {
        assert!(predictions_match("  hello world  ", "Hello World"));
        assert!(predictions_match("HELLO WORLD", "hello world"));
    }

    #[test]
    fn test_punctuation_breaks_match() {
        assert!(!predictions_match("Hello World!", "Hello World"));
    }

    #[test]
    fn test_interior_whitespace_is_significant() {
        assert!(!predictions_match("Hello  World", "Hello World"));
    }

    #[test]
    fn test_empty_prediction() {
        assert!(!predictions_match("", "Hello"));
        assert!(predictions_match("", ""));
    }
}
