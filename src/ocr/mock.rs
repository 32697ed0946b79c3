//! Mock text reader
//!
//! Fabricates OCR results without loading any model. When built for a
//! dataset it echoes the expected text from the label manifest,
//! corrupting a configurable fraction of samples so the demo shows a
//! realistic accuracy figure. Unknown images get canned detections.

use crate::ocr::{Detection, OcrError, TextReader};
use rand::Rng;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Suffix appended to corrupted predictions
const SIMULATED_ERROR_SUFFIX: &str = " (simulated error)";

/// Model-free reader returning fabricated detections
pub struct MockReader {
    labels: HashMap<String, String>,
    error_rate: f64,
}

impl MockReader {
    /// Mock reader with no label knowledge (canned detections only)
    pub fn new(error_rate: f64) -> Self {
        Self {
            labels: HashMap::new(),
            error_rate,
        }
    }

    /// Mock reader primed with a dataset's label manifest.
    ///
    /// An unreadable manifest leaves the label map empty rather than
    /// failing; the reader then behaves like [`MockReader::new`].
    pub fn for_dataset(dataset_dir: &Path, error_rate: f64) -> Self {
        let labels = match crate::dataset::read_manifest(dataset_dir) {
            Ok(entries) => entries
                .into_iter()
                .map(|entry| (entry.filename, entry.text))
                .collect(),
            Err(e) => {
                debug!("Mock reader found no usable manifest: {e:#}");
                HashMap::new()
            }
        };

        Self { labels, error_rate }
    }

    fn should_corrupt(&self) -> bool {
        self.error_rate > 0.0 && rand::thread_rng().gen::<f64>() < self.error_rate
    }
}

impl TextReader for MockReader {
    fn detect(&self, image: &Path) -> Result<Vec<Detection>, OcrError> {
        let filename = image
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Some(expected) = self.labels.get(&filename) {
            let (text, confidence) = if self.should_corrupt() {
                (format!("{expected}{SIMULATED_ERROR_SUFFIX}"), 0.55)
            } else {
                (expected.clone(), 0.95)
            };

            return Ok(vec![Detection {
                points: vec![[0.0, 0.0], [300.0, 0.0], [300.0, 100.0], [0.0, 100.0]],
                text,
                confidence,
            }]);
        }

        Ok(canned_detections())
    }
}

/// Demo detections for images outside any known dataset
fn canned_detections() -> Vec<Detection> {
    vec![
        Detection {
            points: vec![[10.0, 10.0], [200.0, 10.0], [200.0, 50.0], [10.0, 50.0]],
            text: "Hello World".to_string(),
            confidence: 0.95,
        },
        Detection {
            points: vec![[10.0, 60.0], [250.0, 60.0], [250.0, 100.0], [10.0, 100.0]],
            text: "This is a demo".to_string(),
            confidence: 0.92,
        },
        Detection {
            points: vec![[10.0, 110.0], [220.0, 110.0], [220.0, 150.0], [10.0, 150.0]],
            text: "Text recognition test".to_string(),
            confidence: 0.88,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LABELS_FILE;

    fn dataset_with_labels(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LABELS_FILE), content).unwrap();
        dir
    }

    #[test]
    fn test_known_image_echoes_expected_text() {
        let dir = dataset_with_labels("img1.jpg\tHello World\n");
        let reader = MockReader::for_dataset(dir.path(), 0.0);

        let detections = reader.detect(&dir.path().join("img1.jpg")).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].text, "Hello World");
        assert!(detections[0].confidence > 0.9);
    }

    #[test]
    fn test_error_rate_one_always_corrupts() {
        let dir = dataset_with_labels("img1.jpg\tHello World\n");
        let reader = MockReader::for_dataset(dir.path(), 1.0);

        let detections = reader.detect(&dir.path().join("img1.jpg")).unwrap();
        assert_eq!(
            detections[0].text,
            format!("Hello World{SIMULATED_ERROR_SUFFIX}")
        );
    }

    #[test]
    fn test_unknown_image_gets_canned_detections() {
        let reader = MockReader::new(0.0);
        let detections = reader.detect(Path::new("whatever.png")).unwrap();
        assert_eq!(detections.len(), 3);
        assert_eq!(detections[0].text, "Hello World");
    }

    #[test]
    fn test_missing_manifest_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let reader = MockReader::for_dataset(dir.path(), 0.0);
        assert_eq!(reader.detect(Path::new("x.jpg")).unwrap().len(), 3);
    }

    #[test]
    fn test_full_text_of_known_image() {
        let dir = dataset_with_labels("img1.jpg\tHello World\n");
        let reader = MockReader::for_dataset(dir.path(), 0.0);

        let text = reader.full_text(&dir.path().join("img1.jpg")).unwrap();
        assert_eq!(text, "Hello World");
    }
}
