//! Application Configuration
//!
//! User settings and preferences stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Dataset and model storage settings
    pub storage: StorageConfig,
    /// OCR engine settings
    pub ocr: OcrSettings,
    /// Evaluation job settings
    pub evaluation: EvaluationConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener on
    pub host: String,
    /// Port to bind the HTTP listener on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Dataset and model storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root data directory; platform data dir when unset
    pub data_dir: Option<PathBuf>,
    /// Sample dataset directory; `<data_dir>/datasets/sample` when unset
    pub sample_dataset_dir: Option<PathBuf>,
    /// Uploaded datasets directory; `<data_dir>/datasets/uploads` when unset
    pub uploads_dir: Option<PathBuf>,
}

/// OCR engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrSettings {
    /// Model cache directory; `<data_dir>/models` when unset
    pub models_dir: Option<PathBuf>,
    /// Fraction of samples the mock reader corrupts (0.0 - 1.0)
    pub mock_error_rate: f64,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            models_dir: None,
            mock_error_rate: 0.1,
        }
    }
}

/// Evaluation job settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Pause between pipeline stages, in milliseconds
    pub stage_delay_ms: u64,
    /// Pause after each processed sample, in milliseconds
    pub sample_delay_ms: u64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            stage_delay_ms: 1000,
            sample_delay_ms: 500,
        }
    }
}

impl AppConfig {
    /// Resolve the root data directory
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.storage.data_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                Ok(dir.clone())
            }
            None => crate::storage::get_data_dir(),
        }
    }

    /// Resolve the sample dataset directory
    pub fn sample_dataset_dir(&self) -> Result<PathBuf> {
        match &self.storage.sample_dataset_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.data_dir()?.join("datasets").join("sample")),
        }
    }

    /// Resolve the uploaded datasets directory, creating it if needed
    pub fn uploads_dir(&self) -> Result<PathBuf> {
        let dir = match &self.storage.uploads_dir {
            Some(dir) => dir.clone(),
            None => self.data_dir()?.join("datasets").join("uploads"),
        };
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Resolve the model cache directory
    pub fn models_dir(&self) -> Result<PathBuf> {
        match &self.ocr.models_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.data_dir()?.join("models")),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);

        assert!(config.storage.data_dir.is_none());
        assert!(config.storage.sample_dataset_dir.is_none());

        assert!((config.ocr.mock_error_rate - 0.1).abs() < 1e-9);

        assert_eq!(config.evaluation.stage_delay_ms, 1000);
        assert_eq!(config.evaluation.sample_delay_ms, 500);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AppConfig::default();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.server.host, parsed.server.host);
        assert_eq!(config.server.port, parsed.server.port);
        assert_eq!(
            config.evaluation.sample_delay_ms,
            parsed.evaluation.sample_delay_ms
        );
    }

    #[test]
    fn test_config_with_custom_values() {
        let mut config = AppConfig::default();
        config.server.port = 9090;
        config.storage.data_dir = Some(PathBuf::from("/tmp/ocr-bench"));
        config.evaluation.sample_delay_ms = 0;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.server.port, 9090);
        assert_eq!(
            parsed.storage.data_dir,
            Some(PathBuf::from("/tmp/ocr-bench"))
        );
        assert_eq!(parsed.evaluation.sample_delay_ms, 0);
    }

    #[test]
    fn test_path_resolution_with_data_dir_override() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.data_dir = Some(dir.path().to_path_buf());

        assert_eq!(
            config.sample_dataset_dir().unwrap(),
            dir.path().join("datasets").join("sample")
        );
        assert_eq!(config.models_dir().unwrap(), dir.path().join("models"));
        assert!(config.uploads_dir().unwrap().is_dir());
    }

    #[test]
    fn test_save_and_load_config() {
        let config = AppConfig::default();

        let temp_file = NamedTempFile::new().unwrap();

        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(config.server.port, loaded.server.port);
        assert_eq!(
            config.evaluation.stage_delay_ms,
            loaded.evaluation.stage_delay_ms
        );
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
