//! Model file management
//!
//! Handles downloading and caching of the PaddleOCR ONNX models the
//! oar-ocr pipeline runs. Detection is language independent; the
//! recognition model and its character dictionary are picked per
//! language.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Model artifact kinds making up one OCR pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Text detection model (DBNet)
    Detection,
    /// Text recognition model (CRNN)
    Recognition,
    /// Character dictionary for recognition
    Dictionary,
}

impl ModelKind {
    /// Cache filename for this artifact
    pub fn filename(&self, language: &str) -> String {
        match self {
            ModelKind::Detection => "det.onnx".to_string(),
            ModelKind::Recognition => format!("rec_{language}.onnx"),
            ModelKind::Dictionary => format!("dict_{language}.txt"),
        }
    }

    /// Download URL for this artifact
    /// Using PaddleOCR models from Hugging Face (monkt/paddleocr-onnx)
    pub fn download_url(&self, language: &str) -> String {
        const BASE: &str = "https://huggingface.co/monkt/paddleocr-onnx/resolve/main";
        match self {
            ModelKind::Detection => format!("{BASE}/detection/v3/det.onnx"),
            ModelKind::Recognition => format!("{BASE}/languages/{language}/rec.onnx"),
            ModelKind::Dictionary => format!("{BASE}/languages/{language}/dict.txt"),
        }
    }

    /// Expected file size for integrity check (approximate, in bytes)
    pub fn expected_size_range(&self) -> (u64, u64) {
        match self {
            ModelKind::Detection => (2_000_000, 5_000_000), // ~2.43 MB
            ModelKind::Recognition => (7_000_000, 10_000_000), // ~7.83 MB
            ModelKind::Dictionary => (500, 10_000),         // ~1.42 KB
        }
    }

    /// Display name for logging
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelKind::Detection => "Text Detection",
            ModelKind::Recognition => "Text Recognition",
            ModelKind::Dictionary => "Character Dictionary",
        }
    }
}

/// Map a user-supplied language code to a model repository language
pub fn canonical_language(code: &str) -> Option<&'static str> {
    match code.trim().to_ascii_lowercase().as_str() {
        "en" | "eng" | "english" => Some("english"),
        _ => None,
    }
}

/// Paths of the artifacts one pipeline is built from
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub detection: PathBuf,
    pub recognition: PathBuf,
    pub dictionary: PathBuf,
}

/// Manifest tracking downloaded model files
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ModelManifest {
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelInfo {
    pub filename: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub downloaded_at: String,
}

/// Download cache for ONNX models and dictionaries
pub struct ModelLibrary {
    models_dir: PathBuf,
}

impl ModelLibrary {
    /// Create a model library rooted at the given cache directory
    pub fn new(models_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&models_dir)?;
        Ok(Self { models_dir })
    }

    /// Get the models directory path
    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Cache path of one artifact
    pub fn model_path(&self, kind: ModelKind, language: &str) -> PathBuf {
        self.models_dir.join(kind.filename(language))
    }

    /// Check whether an artifact is cached and plausibly sized
    pub fn is_available(&self, kind: ModelKind, language: &str) -> bool {
        let path = self.model_path(kind, language);
        if !path.exists() {
            return false;
        }

        match std::fs::metadata(&path) {
            Ok(metadata) => {
                let (min, max) = kind.expected_size_range();
                let size = metadata.len();
                size >= min && size <= max
            }
            Err(_) => false,
        }
    }

    /// Ensure one artifact is cached, downloading it if needed
    pub async fn ensure(&self, kind: ModelKind, language: &str) -> Result<PathBuf> {
        let path = self.model_path(kind, language);

        if self.is_available(kind, language) {
            debug!("Model {:?} already available at {:?}", kind, path);
            return Ok(path);
        }

        self.download(kind, language).await?;

        if !self.is_available(kind, language) {
            anyhow::bail!(
                "Download completed but verification failed for {}",
                kind.filename(language)
            );
        }

        Ok(path)
    }

    /// Ensure the full artifact set for one language
    pub async fn ensure_language(&self, language: &str) -> Result<ModelPaths> {
        Ok(ModelPaths {
            detection: self.ensure(ModelKind::Detection, language).await?,
            recognition: self.ensure(ModelKind::Recognition, language).await?,
            dictionary: self.ensure(ModelKind::Dictionary, language).await?,
        })
    }

    /// Streaming download of one artifact into the cache
    async fn download(&self, kind: ModelKind, language: &str) -> Result<()> {
        let url = kind.download_url(language);
        let path = self.model_path(kind, language);

        info!("Downloading {} model from {}", kind.display_name(), url);

        if std::env::var("OCR_BENCH_OFFLINE").is_ok() {
            anyhow::bail!(
                "Offline mode: cannot download models. Please download manually from {} and place at {:?}",
                url,
                path
            );
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .context("Failed to create HTTP client")?;

        let response = client
            .get(&url)
            .send()
            .await
            .context("Failed to send download request")?;

        if !response.status().is_success() {
            anyhow::bail!("Download failed with status {}: {}", response.status(), url);
        }

        let total_size = response.content_length();
        debug!("Download size: {:?} bytes", total_size);

        let temp_path = path.with_extension("tmp");
        let mut file =
            std::fs::File::create(&temp_path).context("Failed to create temp file")?;

        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Error reading download stream")?;

            file.write_all(&chunk)
                .context("Failed to write to temp file")?;

            hasher.update(&chunk);
            downloaded += chunk.len() as u64;
        }

        file.flush().context("Failed to flush temp file")?;
        drop(file);

        let hash = format!("{:x}", hasher.finalize());

        std::fs::rename(&temp_path, &path)
            .context("Failed to move downloaded file to final location")?;

        self.record_download(kind, language, downloaded, hash)?;

        info!(
            "Successfully downloaded {} model ({} bytes)",
            kind.display_name(),
            downloaded
        );
        Ok(())
    }

    /// Update the cache manifest after a successful download
    fn record_download(
        &self,
        kind: ModelKind,
        language: &str,
        size_bytes: u64,
        sha256: String,
    ) -> Result<()> {
        let mut manifest = self.load_manifest().unwrap_or_default();

        let model_info = ModelInfo {
            filename: kind.filename(language),
            size_bytes,
            sha256,
            downloaded_at: chrono::Utc::now().to_rfc3339(),
        };

        if let Some(existing) = manifest
            .models
            .iter_mut()
            .find(|m| m.filename == model_info.filename)
        {
            *existing = model_info;
        } else {
            manifest.models.push(model_info);
        }

        self.save_manifest(&manifest)
    }

    /// Load the cache manifest
    pub fn load_manifest(&self) -> Result<ModelManifest> {
        let manifest_path = self.models_dir.join("manifest.json");
        if manifest_path.exists() {
            let content = std::fs::read_to_string(&manifest_path)?;
            let manifest: ModelManifest = serde_json::from_str(&content)?;
            Ok(manifest)
        } else {
            Ok(ModelManifest::default())
        }
    }

    /// Save the cache manifest
    pub fn save_manifest(&self, manifest: &ModelManifest) -> Result<()> {
        let manifest_path = self.models_dir.join("manifest.json");
        let content = serde_json::to_string_pretty(manifest)?;
        std::fs::write(manifest_path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_filenames_per_language() {
        assert_eq!(ModelKind::Detection.filename("english"), "det.onnx");
        assert_eq!(
            ModelKind::Recognition.filename("english"),
            "rec_english.onnx"
        );
        assert_eq!(ModelKind::Dictionary.filename("english"), "dict_english.txt");
    }

    #[test]
    fn test_download_urls() {
        assert!(ModelKind::Detection
            .download_url("english")
            .ends_with("detection/v3/det.onnx"));
        assert!(ModelKind::Recognition
            .download_url("english")
            .ends_with("languages/english/rec.onnx"));
    }

    #[test]
    fn test_canonical_language() {
        assert_eq!(canonical_language("en"), Some("english"));
        assert_eq!(canonical_language(" EN "), Some("english"));
        assert_eq!(canonical_language("english"), Some("english"));
        assert_eq!(canonical_language("fr"), None);
        assert_eq!(canonical_language(""), None);
    }

    #[test]
    fn test_availability_checks_size_range() {
        let dir = tempfile::tempdir().unwrap();
        let library = ModelLibrary::new(dir.path().to_path_buf()).unwrap();

        assert!(!library.is_available(ModelKind::Dictionary, "english"));

        // An implausibly small file does not count as available
        std::fs::write(library.model_path(ModelKind::Dictionary, "english"), "x").unwrap();
        assert!(!library.is_available(ModelKind::Dictionary, "english"));

        std::fs::write(
            library.model_path(ModelKind::Dictionary, "english"),
            "a\n".repeat(400),
        )
        .unwrap();
        assert!(library.is_available(ModelKind::Dictionary, "english"));
    }

    #[test]
    fn test_manifest_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let library = ModelLibrary::new(dir.path().to_path_buf()).unwrap();

        let manifest = ModelManifest {
            models: vec![ModelInfo {
                filename: "det.onnx".to_string(),
                size_bytes: 42,
                sha256: "abc".to_string(),
                downloaded_at: "2024-01-01T00:00:00Z".to_string(),
            }],
        };

        library.save_manifest(&manifest).unwrap();
        let loaded = library.load_manifest().unwrap();
        assert_eq!(loaded.models.len(), 1);
        assert_eq!(loaded.models[0].filename, "det.onnx");
    }
}
