//! paddle-ocr-core - PaddleOCR-style text detection and recognition
//!
//! Loads a DB detection model and a CTC recognition model through ONNX
//! Runtime and turns an RGB image into ordered `{bbox, text, score}` results.

pub mod config;
pub mod error;
pub mod vision;

pub use config::{load_config, save_config, OcrConfig};
pub use error::{ConfigError, DictionaryError, InferenceError, OcrError};
pub use vision::{Image, OcrPipeline, PipelinePool, TextResult};
