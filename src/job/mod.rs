//! Job Tracker
//!
//! Guarantees at most one concurrent training job, exposes a
//! polling-readable status record, and finalizes the record when the
//! background evaluation task ends. The record is owned here, guarded
//! by a mutex, and handed to the task as a generation-tagged write
//! handle: a reset bumps the generation, after which writes from the
//! superseded task are discarded instead of resurrecting stale status.

pub mod eval;
mod status;

pub use eval::Pacing;
pub use status::{
    EvaluationReport, JobState, JobStatus, SampleOutcome, StateKind, StatusSnapshot,
};

use crate::ocr::EngineOptions;
use crate::storage::LABELS_FILE;
use chrono::Utc;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Parameters of one submitted job
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Dataset directory holding images and `labels.txt`
    pub dataset_dir: PathBuf,
    /// Requested OCR language codes
    pub languages: Vec<String>,
    /// Request GPU execution when available
    pub use_accelerator: bool,
}

/// Synchronous rejection reasons for a submission
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Training is already in progress")]
    AlreadyRunning,
    #[error("At least one valid language code is required")]
    InvalidLanguages,
    #[error("Dataset not found")]
    DatasetNotFound,
    #[error("Labels file not found in dataset")]
    ManifestMissing,
}

struct TrackerInner {
    status: JobStatus,
    generation: u64,
}

/// Single-slot tracker for the background evaluation job
#[derive(Clone)]
pub struct JobTracker {
    inner: Arc<Mutex<TrackerInner>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(TrackerInner {
                status: JobStatus::idle(),
                generation: 0,
            })),
        }
    }

    /// Read-only copy of the current status; safe under concurrent polling
    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.lock().status.snapshot()
    }

    /// Force the record back to Idle.
    ///
    /// Does not cancel an in-flight task; the generation bump makes its
    /// remaining writes no-ops.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.status = JobStatus::idle();
        info!("Training state reset");
    }

    /// Validate a request and start the evaluation task.
    ///
    /// On acceptance the record is flipped to Running and the task is
    /// spawned onto the runtime; the caller never blocks on it.
    pub fn submit(
        &self,
        request: JobRequest,
        engine: EngineOptions,
        pacing: Pacing,
    ) -> Result<(), SubmitError> {
        if request.languages.is_empty()
            || request.languages.iter().any(|lang| lang.trim().is_empty())
        {
            return Err(SubmitError::InvalidLanguages);
        }
        if !request.dataset_dir.is_dir() {
            return Err(SubmitError::DatasetNotFound);
        }
        if !request.dataset_dir.join(LABELS_FILE).is_file() {
            return Err(SubmitError::ManifestMissing);
        }

        let handle = self.begin(request.dataset_dir.display().to_string())?;

        info!(
            "Training job accepted for {:?} (languages: {:?})",
            request.dataset_dir, request.languages
        );

        tokio::spawn(eval::run(
            handle,
            request.dataset_dir,
            request.languages,
            request.use_accelerator,
            engine,
            pacing,
        ));

        Ok(())
    }

    /// Flip the record to Running under a single lock acquisition.
    ///
    /// The Running check and the state write share one critical
    /// section, so duplicate admission is impossible even on a
    /// multi-threaded runtime.
    fn begin(&self, dataset: String) -> Result<JobHandle, SubmitError> {
        let mut inner = self.inner.lock();

        if inner.status.state.is_running() {
            return Err(SubmitError::AlreadyRunning);
        }

        inner.generation += 1;
        inner.status = JobStatus {
            state: JobState::Running {
                progress: 0,
                message: "Training started".to_string(),
            },
            started_at: Some(Utc::now()),
            ended_at: None,
            dataset: Some(dataset),
        };

        Ok(JobHandle {
            inner: self.inner.clone(),
            generation: inner.generation,
        })
    }
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Write handle held by one background task.
///
/// Every write checks the generation it was born with; writes from a
/// superseded job return false and change nothing.
pub struct JobHandle {
    inner: Arc<Mutex<TrackerInner>>,
    generation: u64,
}

impl JobHandle {
    /// Update progress and message while Running
    pub fn progress(&self, progress: u8, message: impl Into<String>) -> bool {
        let mut inner = self.inner.lock();
        if inner.generation != self.generation || !inner.status.state.is_running() {
            return false;
        }

        inner.status.state = JobState::Running {
            progress,
            message: message.into(),
        };
        true
    }

    /// Finalize as Completed with the evaluation report
    pub fn complete(&self, result: EvaluationReport) -> bool {
        self.finalize(JobState::Completed { result })
    }

    /// Finalize as Failed with the error message
    pub fn fail(&self, message: String) -> bool {
        self.finalize(JobState::Failed { message })
    }

    fn finalize(&self, state: JobState) -> bool {
        let mut inner = self.inner.lock();
        if inner.generation != self.generation {
            debug!("Dropping write from superseded job generation {}", self.generation);
            return false;
        }

        inner.status.state = state;
        inner.status.ended_at = Some(Utc::now());
        true
    }
}
