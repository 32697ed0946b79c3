//! OCR Bench - web playground for evaluating a pretrained OCR pipeline
//!
//! Exposes text recognition through an HTTP API and a browser UI: upload
//! a folder of images plus a tab-separated label file, start a background
//! evaluation job, and poll its progress and per-sample results. The
//! recognition itself is delegated to pretrained PaddleOCR models run
//! through the oar-ocr pipeline; a mock mode fabricates results without
//! loading any model.

pub mod config;
pub mod dataset;
pub mod job;
pub mod ocr;
pub mod server;
pub mod storage;
