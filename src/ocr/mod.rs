//! OCR capability
//!
//! The application treats text recognition as an opaque capability:
//! given an image path, return a list of (quadrilateral, text,
//! confidence) detections. The real implementation wraps the oar-ocr
//! PaddleOCR pipeline; the mock fabricates detections without loading
//! any model.

pub mod mock;
pub mod models;
pub mod paddle;

pub use mock::MockReader;
pub use models::{canonical_language, ModelLibrary, ModelPaths};
pub use paddle::PaddleReader;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// One recognized text fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Corner points of the bounding quadrilateral, in image pixels
    pub points: Vec<[f32; 2]>,
    /// Recognized text
    pub text: String,
    /// Recognition confidence (0.0 - 1.0)
    pub confidence: f32,
}

/// Failure modes of the OCR capability
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Failed to initialize OCR model: {0}")]
    ModelInit(String),
    #[error("Failed to read image {path:?}: {reason}")]
    ImageRead { path: PathBuf, reason: String },
    #[error("OCR inference failed: {0}")]
    Inference(String),
}

/// Text recognition over image files
pub trait TextReader: Send + Sync {
    /// Detect and recognize text fragments in an image
    fn detect(&self, image: &Path) -> Result<Vec<Detection>, OcrError>;

    /// All recognized text of an image as a single space-joined string
    fn full_text(&self, image: &Path) -> Result<String, OcrError> {
        let detections = self.detect(image)?;
        let fragments: Vec<&str> = detections.iter().map(|d| d.text.as_str()).collect();
        Ok(fragments.join(" "))
    }
}

/// Engine selection shared by the job runner and the detect endpoint
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Fabricate results instead of running a model
    pub mock: bool,
    /// Fraction of known samples the mock corrupts
    pub mock_error_rate: f64,
    /// Model cache directory for the real engine
    pub models_dir: PathBuf,
}

/// Build the reader for one job or detect request.
///
/// The real engine resolves the first requested language to a model set,
/// downloads missing model files and constructs the ONNX sessions on a
/// blocking thread. The mock engine picks up the dataset's label map
/// when a dataset directory is given.
pub async fn prepare_reader(
    options: &EngineOptions,
    languages: &[String],
    use_accelerator: bool,
    dataset_dir: Option<&Path>,
) -> Result<Arc<dyn TextReader>, OcrError> {
    if options.mock {
        let reader = match dataset_dir {
            Some(dir) => MockReader::for_dataset(dir, options.mock_error_rate),
            None => MockReader::new(options.mock_error_rate),
        };
        return Ok(Arc::new(reader));
    }

    let code = languages
        .first()
        .ok_or_else(|| OcrError::ModelInit("No language requested".to_string()))?;
    let language = canonical_language(code)
        .ok_or_else(|| OcrError::ModelInit(format!("Unsupported language code: {code}")))?;
    if languages.len() > 1 {
        warn!(
            "Multiple languages requested {:?}; recognition models are per-language, using {}",
            languages, language
        );
    }

    let library = ModelLibrary::new(options.models_dir.clone())
        .map_err(|e| OcrError::ModelInit(e.to_string()))?;
    let paths = library
        .ensure_language(language)
        .await
        .map_err(|e| OcrError::ModelInit(e.to_string()))?;

    let reader = tokio::task::spawn_blocking(move || PaddleReader::new(&paths, use_accelerator))
        .await
        .map_err(|e| OcrError::ModelInit(format!("Model loading task failed: {e}")))??;

    Ok(Arc::new(reader))
}
