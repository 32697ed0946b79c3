//! Route handlers

use crate::dataset;
use crate::job::{JobRequest, Pacing, StatusSnapshot};
use crate::ocr::{self, Detection};
use crate::server::{ApiError, SharedState};
use crate::storage::{is_image_filename, sanitize_filename, LABELS_FILE};
use axum::extract::{Multipart, Path as UrlPath, State};
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{debug, info};

const MAX_UPLOAD_FILES: usize = 100;
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
const MAX_LABELS_BYTES: usize = 1024 * 1024;

/// Serve the single-page UI
pub(super) async fn ui() -> Html<&'static str> {
    Html(include_str!("static/index.html"))
}

/// Liveness probe
pub(super) async fn health(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "OCR Bench API is running",
        "mode": if state.mock { "mock" } else { "model" },
    }))
}

/// List the sample dataset and all uploaded datasets
pub(super) async fn list_datasets(
    State(state): State<SharedState>,
) -> Result<Json<Value>, ApiError> {
    let sample_dir = state.config.sample_dataset_dir()?;
    let uploads_dir = state.config.uploads_dir()?;

    let datasets = dataset::list_datasets(&sample_dir, &uploads_dir)?;

    Ok(Json(json!({ "datasets": datasets })))
}

/// Accept a multipart dataset upload: repeated `files` image fields
/// plus one `labels` manifest field
pub(super) async fn upload_dataset(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut images: Vec<(String, axum::body::Bytes)> = Vec::new();
    let mut labels: Option<axum::body::Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("files") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Failed to read upload: {e}")))?;
                images.push((filename, data));
            }
            Some("labels") => {
                labels = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::Validation(format!("Failed to read labels: {e}")))?,
                );
            }
            _ => continue,
        }
    }

    if images.len() > MAX_UPLOAD_FILES {
        return Err(ApiError::Validation(format!(
            "Maximum {MAX_UPLOAD_FILES} files allowed per upload"
        )));
    }

    let labels = labels.ok_or_else(|| ApiError::Validation("Labels file is required".into()))?;
    if labels.len() > MAX_LABELS_BYTES {
        return Err(ApiError::Validation("Labels file exceeds 1MB limit".into()));
    }
    let labels_text = std::str::from_utf8(&labels)
        .map_err(|_| ApiError::Validation("Labels file must be valid UTF-8 text".into()))?;

    dataset::validate_manifest(labels_text).map_err(|e| ApiError::Validation(e.to_string()))?;

    let uploads_dir = state.config.uploads_dir()?;
    let upload_path = uploads_dir.join(format!(
        "dataset_{}",
        Utc::now().format("%Y%m%d_%H%M%S")
    ));
    std::fs::create_dir_all(&upload_path)
        .map_err(|e| ApiError::Internal(format!("Failed to create upload directory: {e}")))?;

    let mut image_count = 0;
    for (name, data) in images {
        if !is_image_filename(&name) {
            debug!("Skipping non-image upload {name:?}");
            continue;
        }
        let safe = match sanitize_filename(&name) {
            Some(safe) => safe,
            None => continue,
        };
        if data.len() > MAX_IMAGE_BYTES {
            return Err(ApiError::Validation(format!(
                "File {safe} exceeds 10MB limit"
            )));
        }

        std::fs::write(upload_path.join(&safe), &data)
            .map_err(|e| ApiError::Internal(format!("Failed to store {safe}: {e}")))?;
        image_count += 1;
    }

    std::fs::write(upload_path.join(LABELS_FILE), labels_text)
        .map_err(|e| ApiError::Internal(format!("Failed to store labels: {e}")))?;

    info!("Dataset uploaded to {:?} ({} images)", upload_path, image_count);

    Ok(Json(json!({
        "success": true,
        "message": format!("Dataset uploaded successfully with {image_count} images"),
        "dataset_path": upload_path,
        "image_count": image_count,
    })))
}

/// Sample dataset details for the UI
pub(super) async fn sample_dataset_info(
    State(state): State<SharedState>,
) -> Result<Json<Value>, ApiError> {
    let sample_dir = state.config.sample_dataset_dir()?;
    if !sample_dir.is_dir() {
        return Err(ApiError::NotFound("Sample dataset not found".into()));
    }
    if !sample_dir.join(LABELS_FILE).is_file() {
        return Err(ApiError::NotFound("Labels file not found".into()));
    }

    let samples: Vec<Value> = dataset::read_manifest(&sample_dir)?
        .into_iter()
        .map(|entry| json!({ "filename": entry.filename, "text": entry.text }))
        .collect();

    Ok(Json(json!({
        "path": sample_dir,
        "sample_count": samples.len(),
        "samples": samples,
    })))
}

/// Serve one image of the sample dataset
pub(super) async fn sample_image(
    State(state): State<SharedState>,
    UrlPath(filename): UrlPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let safe = sanitize_filename(&filename)
        .ok_or_else(|| ApiError::Validation("Invalid filename".into()))?;
    if !is_image_filename(&safe) {
        return Err(ApiError::Validation("Invalid file type".into()));
    }

    let image_path = state.config.sample_dataset_dir()?.join(&safe);
    if !image_path.is_file() {
        return Err(ApiError::NotFound("Image not found".into()));
    }

    let bytes = std::fs::read(&image_path)
        .map_err(|e| ApiError::Internal(format!("Failed to read image: {e}")))?;

    let content_type = if safe.to_ascii_lowercase().ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    };

    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}

/// Which dataset a job runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(super) enum DatasetType {
    Sample,
    Uploaded,
}

/// Body of `POST /jobs`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct JobSubmission {
    pub dataset_type: DatasetType,
    #[serde(default)]
    pub dataset_path: Option<String>,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default)]
    pub use_accelerator: bool,
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string()]
}

/// Start a training job
pub(super) async fn submit_job(
    State(state): State<SharedState>,
    Json(submission): Json<JobSubmission>,
) -> Result<Json<Value>, ApiError> {
    let dataset_dir = resolve_dataset_dir(&state, &submission)?;

    let request = JobRequest {
        dataset_dir,
        languages: submission.languages,
        use_accelerator: submission.use_accelerator,
    };
    let engine = state.engine_options()?;
    let pacing = Pacing::from_config(&state.config.evaluation);

    state.tracker.submit(request, engine, pacing)?;

    Ok(Json(json!({ "accepted": true })))
}

fn resolve_dataset_dir(
    state: &SharedState,
    submission: &JobSubmission,
) -> Result<PathBuf, ApiError> {
    match submission.dataset_type {
        DatasetType::Sample => Ok(state.config.sample_dataset_dir()?),
        DatasetType::Uploaded => {
            let path = submission.dataset_path.as_deref().ok_or_else(|| {
                ApiError::Validation("Dataset path required for uploaded datasets".into())
            })?;

            // Uploaded jobs may only reference directories below the
            // uploads root; canonicalization defuses traversal tricks.
            let canonical = PathBuf::from(path)
                .canonicalize()
                .map_err(|_| ApiError::NotFound("Dataset not found".into()))?;
            let uploads_root = state
                .config
                .uploads_dir()?
                .canonicalize()
                .map_err(|e| ApiError::Internal(format!("Failed to resolve uploads dir: {e}")))?;

            if !canonical.starts_with(&uploads_root) {
                return Err(ApiError::Validation(
                    "Dataset path must be inside the uploads directory".into(),
                ));
            }

            Ok(canonical)
        }
    }
}

/// Current job status snapshot
pub(super) async fn job_status(State(state): State<SharedState>) -> Json<StatusSnapshot> {
    Json(state.tracker.snapshot())
}

/// Force the job status back to Idle
pub(super) async fn reset_job(State(state): State<SharedState>) -> Json<Value> {
    state.tracker.reset();
    Json(json!({ "success": true, "message": "Training state reset" }))
}

/// Run OCR once over an uploaded image and return the detections
pub(super) async fn detect(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut upload: Option<(String, axum::body::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let is_image = field
                .content_type()
                .map(|ct| ct.starts_with("image/"))
                .unwrap_or(false);
            if !is_image {
                return Err(ApiError::Validation("File must be an image".into()));
            }

            let filename = field.file_name().unwrap_or("upload.png").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("Failed to read upload: {e}")))?;
            upload = Some((filename, data));
            break;
        }
    }

    let (filename, data) =
        upload.ok_or_else(|| ApiError::Validation("Image file is required".into()))?;
    if data.len() > MAX_IMAGE_BYTES {
        return Err(ApiError::Validation("File size exceeds 10MB limit".into()));
    }

    let temp_dir = std::env::temp_dir().join("ocr_bench_uploads");
    std::fs::create_dir_all(&temp_dir)
        .map_err(|e| ApiError::Internal(format!("Failed to create temp directory: {e}")))?;

    let safe = sanitize_filename(&filename).unwrap_or_else(|| "upload.png".to_string());
    let temp_file = temp_dir.join(format!("upload_{}_{safe}", uuid::Uuid::new_v4()));
    std::fs::write(&temp_file, &data)
        .map_err(|e| ApiError::Internal(format!("Failed to store upload: {e}")))?;

    let result = run_detection(&state, temp_file.clone()).await;

    // Best effort cleanup; detection outcome wins
    let _ = std::fs::remove_file(&temp_file);

    let detections = result?;
    let count = detections.len();

    Ok(Json(json!({
        "success": true,
        "detections": detections,
        "count": count,
    })))
}

async fn run_detection(
    state: &SharedState,
    image_path: PathBuf,
) -> Result<Vec<Detection>, ApiError> {
    let engine = state.engine_options()?;
    let reader = ocr::prepare_reader(&engine, &default_languages(), false, None).await?;

    let detections = tokio::task::spawn_blocking(move || reader.detect(&image_path))
        .await
        .map_err(|e| ApiError::Internal(format!("Detection task failed: {e}")))??;

    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::job::{JobTracker, StateKind};
    use crate::server::AppState;
    use std::sync::Arc;
    use std::time::Duration;

    fn test_state(root: &std::path::Path, mock: bool) -> SharedState {
        let mut config = AppConfig::default();
        config.storage.data_dir = Some(root.to_path_buf());
        config.evaluation.stage_delay_ms = 0;
        config.evaluation.sample_delay_ms = 0;

        Arc::new(AppState {
            tracker: JobTracker::new(),
            config,
            mock,
        })
    }

    fn write_sample_dataset(state: &SharedState, entries: &[(&str, &str)]) {
        let dir = state.config.sample_dataset_dir().unwrap();
        std::fs::create_dir_all(&dir).unwrap();
        let mut manifest = String::new();
        for (filename, text) in entries {
            manifest.push_str(&format!("{filename}\t{text}\n"));
            std::fs::write(dir.join(filename), b"").unwrap();
        }
        std::fs::write(dir.join(LABELS_FILE), manifest).unwrap();
    }

    #[tokio::test]
    async fn test_submit_sample_job_end_to_end() {
        let root = tempfile::tempdir().unwrap();
        let state = test_state(root.path(), true);
        write_sample_dataset(&state, &[("a.jpg", "Hello"), ("b.jpg", "World")]);

        let submission = JobSubmission {
            dataset_type: DatasetType::Sample,
            dataset_path: None,
            languages: default_languages(),
            use_accelerator: false,
        };

        let response = submit_job(State(state.clone()), Json(submission))
            .await
            .unwrap();
        assert_eq!(response.0["accepted"], true);

        for _ in 0..500 {
            if state.tracker.snapshot().state != StateKind::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let snapshot = job_status(State(state)).await.0;
        assert_eq!(snapshot.state, StateKind::Completed);
        assert_eq!(snapshot.result.unwrap().total_samples, 2);
    }

    #[tokio::test]
    async fn test_submit_uploaded_requires_path() {
        let root = tempfile::tempdir().unwrap();
        let state = test_state(root.path(), true);

        let submission = JobSubmission {
            dataset_type: DatasetType::Uploaded,
            dataset_path: None,
            languages: default_languages(),
            use_accelerator: false,
        };

        let result = submit_job(State(state), Json(submission)).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_submit_uploaded_rejects_path_outside_uploads() {
        let root = tempfile::tempdir().unwrap();
        let state = test_state(root.path(), true);

        // A real directory, but not below the uploads root
        let outside = tempfile::tempdir().unwrap();
        let submission = JobSubmission {
            dataset_type: DatasetType::Uploaded,
            dataset_path: Some(outside.path().to_string_lossy().into_owned()),
            languages: default_languages(),
            use_accelerator: false,
        };

        let result = submit_job(State(state), Json(submission)).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_submit_missing_sample_dataset_is_404() {
        let root = tempfile::tempdir().unwrap();
        let state = test_state(root.path(), true);

        let submission = JobSubmission {
            dataset_type: DatasetType::Sample,
            dataset_path: None,
            languages: default_languages(),
            use_accelerator: false,
        };

        let result = submit_job(State(state), Json(submission)).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_sample_image_rejects_traversal_and_bad_types() {
        let root = tempfile::tempdir().unwrap();
        let state = test_state(root.path(), true);
        write_sample_dataset(&state, &[("a.jpg", "Hello")]);

        let result = sample_image(
            State(state.clone()),
            UrlPath(".hidden.jpg".to_string()),
        )
        .await;
        assert!(matches!(result, Err(ApiError::Validation(_))));

        let result = sample_image(State(state.clone()), UrlPath("labels.txt".to_string())).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));

        let result = sample_image(State(state), UrlPath("missing.jpg".to_string())).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_reset_endpoint() {
        let root = tempfile::tempdir().unwrap();
        let state = test_state(root.path(), true);

        let response = reset_job(State(state.clone())).await;
        assert_eq!(response.0["success"], true);
        assert_eq!(state.tracker.snapshot().state, StateKind::Idle);
    }
}
