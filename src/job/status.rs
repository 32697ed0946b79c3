//! Job status types
//!
//! The tracker's internal state is a tagged union so that illegal
//! combinations (a result while running, a progress value while idle)
//! are unrepresentable. Polling clients receive a flattened
//! [`StatusSnapshot`] derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discriminant of the job state, as shown to polling clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Job lifecycle state with per-state payload
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Idle,
    Running { progress: u8, message: String },
    Completed { result: EvaluationReport },
    Failed { message: String },
}

impl JobState {
    pub fn kind(&self) -> StateKind {
        match self {
            JobState::Idle => StateKind::Idle,
            JobState::Running { .. } => StateKind::Running,
            JobState::Completed { .. } => StateKind::Completed,
            JobState::Failed { .. } => StateKind::Failed,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, JobState::Running { .. })
    }
}

/// The single shared job-status record
#[derive(Debug, Clone)]
pub struct JobStatus {
    pub state: JobState,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub dataset: Option<String>,
}

impl JobStatus {
    /// The record a fresh or reset tracker holds
    pub fn idle() -> Self {
        Self {
            state: JobState::Idle,
            started_at: None,
            ended_at: None,
            dataset: None,
        }
    }

    /// Flatten into the wire shape
    pub fn snapshot(&self) -> StatusSnapshot {
        let (message, progress, result) = match &self.state {
            JobState::Idle => (String::new(), 0, None),
            JobState::Running { progress, message } => (message.clone(), *progress, None),
            JobState::Completed { result } => (
                "Training completed successfully".to_string(),
                100,
                Some(result.clone()),
            ),
            JobState::Failed { message } => (message.clone(), 0, None),
        };

        StatusSnapshot {
            state: self.state.kind(),
            message,
            progress,
            started_at: self.started_at,
            ended_at: self.ended_at,
            dataset: self.dataset.clone(),
            result,
        }
    }
}

/// Flattened, serializable view of the status record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: StateKind,
    pub message: String,
    pub progress: u8,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub dataset: Option<String>,
    pub result: Option<EvaluationReport>,
}

/// Final summary of one evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub total_samples: usize,
    pub correct_predictions: usize,
    /// Accuracy percentage, rounded to two decimals
    pub accuracy: f64,
    pub details: Vec<SampleOutcome>,
}

impl EvaluationReport {
    /// Build the report from per-sample outcomes.
    ///
    /// Accuracy is 0.0 for an empty outcome list rather than NaN.
    pub fn from_outcomes(details: Vec<SampleOutcome>) -> Self {
        let total_samples = details.len();
        let correct_predictions = details.iter().filter(|o| o.correct).count();
        let accuracy = if total_samples > 0 {
            let raw = correct_predictions as f64 / total_samples as f64 * 100.0;
            (raw * 100.0).round() / 100.0
        } else {
            0.0
        };

        Self {
            total_samples,
            correct_predictions,
            accuracy,
            details,
        }
    }
}

/// Verdict for one evaluated sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleOutcome {
    pub filename: String,
    pub ground_truth: String,
    pub predicted: String,
    pub correct: bool,
}
