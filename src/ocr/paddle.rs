//! PaddleOCR-backed text reader
//!
//! Wraps the oar-ocr detection + recognition pipeline behind the
//! [`TextReader`](crate::ocr::TextReader) trait. The pipeline mutates
//! internal session state on predict, so it lives behind a mutex.

use crate::ocr::{Detection, ModelPaths, OcrError, TextReader};
use oar_ocr::pipeline::OAROCRBuilder;
use parking_lot::Mutex;
use std::path::Path;
use tracing::{debug, info, warn};

/// OCR engine running PaddleOCR models through ONNX Runtime
pub struct PaddleReader {
    pipeline: Mutex<oar_ocr::pipeline::OAROCR>,
}

impl PaddleReader {
    /// Build the pipeline from a cached model set.
    ///
    /// `use_accelerator` requests GPU execution; this build carries no
    /// GPU execution provider, so the request downgrades to CPU with a
    /// warning instead of failing the job.
    pub fn new(models: &ModelPaths, use_accelerator: bool) -> Result<Self, OcrError> {
        if use_accelerator {
            warn!("GPU execution providers are not compiled into this build, using CPU");
        }

        info!(
            "Initializing OCR pipeline (det: {:?}, rec: {:?})",
            models.detection, models.recognition
        );

        let pipeline = OAROCRBuilder::new(
            models.detection.to_string_lossy().into_owned(),
            models.recognition.to_string_lossy().into_owned(),
            models.dictionary.to_string_lossy().into_owned(),
        )
        .text_detection_batch_size(1)
        .text_recognition_batch_size(1)
        .text_rec_score_thresh(0.0)
        .text_rec_input_shape((3, 48, 320))
        .build()
        .map_err(|e| OcrError::ModelInit(e.to_string()))?;

        Ok(Self {
            pipeline: Mutex::new(pipeline),
        })
    }
}

impl TextReader for PaddleReader {
    fn detect(&self, image: &Path) -> Result<Vec<Detection>, OcrError> {
        if !image.is_file() {
            return Err(OcrError::ImageRead {
                path: image.to_path_buf(),
                reason: "file not found".to_string(),
            });
        }

        // Decode failures surface as ImageRead before inference runs
        image::open(image).map_err(|e| OcrError::ImageRead {
            path: image.to_path_buf(),
            reason: e.to_string(),
        })?;

        let result = {
            let mut pipeline = self.pipeline.lock();
            pipeline
                .predict(image)
                .map_err(|e| OcrError::Inference(e.to_string()))?
        };

        let detections: Vec<Detection> = result
            .text_boxes
            .iter()
            .zip(result.rec_texts.iter())
            .zip(result.rec_scores.iter())
            .map(|((bbox, text), score)| Detection {
                points: bbox.points.iter().map(|p| [p.x, p.y]).collect(),
                text: text.to_string(),
                confidence: *score,
            })
            .collect();

        debug!("Recognized {} text regions in {:?}", detections.len(), image);

        Ok(detections)
    }
}
