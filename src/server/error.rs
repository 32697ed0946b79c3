//! API error type
//!
//! Maps the application's failure taxonomy onto HTTP responses with a
//! `{"detail": ...}` JSON body.

use crate::job::SubmitError;
use crate::ocr::OcrError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request shape or content; job never starts
    #[error("{0}")]
    Validation(String),
    /// Submit rejected, existing job untouched
    #[error("Training is already in progress")]
    AlreadyRunning,
    /// Dataset, manifest or file missing
    #[error("{0}")]
    NotFound(String),
    /// Anything the caller cannot fix
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::AlreadyRunning => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Internal error: {}", self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<SubmitError> for ApiError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::AlreadyRunning => ApiError::AlreadyRunning,
            SubmitError::InvalidLanguages => ApiError::Validation(e.to_string()),
            SubmitError::DatasetNotFound | SubmitError::ManifestMissing => {
                ApiError::NotFound(e.to_string())
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(format!("{e:#}"))
    }
}

impl From<OcrError> for ApiError {
    fn from(e: OcrError) -> Self {
        match e {
            OcrError::ImageRead { .. } => ApiError::Validation(e.to_string()),
            OcrError::ModelInit(_) | OcrError::Inference(_) => {
                ApiError::Internal(format!("Detection failed: {e}"))
            }
        }
    }
}
