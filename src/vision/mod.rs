//! Vision/OCR Layer
//!
//! Two-stage PaddleOCR-style text extraction via ONNX Runtime:
//! - Detection: DB probability map, contours, rotated boxes, NMS
//! - Recognition: grayscale line crops, CTC greedy decoding
//!
//! `OcrPipeline` composes both stages; `PipelinePool` serves concurrent callers.

pub mod db_postprocess;
pub mod detection;
pub mod dictionary;
pub mod frame;
pub mod geometry;
pub mod models;
pub mod ocr;
pub mod orientation;
pub mod pool;
pub mod preprocess;
pub mod recognition;

#[cfg(test)]
pub(crate) mod test_support;

pub use detection::{DetectionBox, Detector};
pub use dictionary::Dictionary;
pub use frame::{ChannelOrder, Image};
pub use models::{EngineMetadata, InferenceEngine, OnnxEngine, TensorInfo};
pub use ocr::{OcrPipeline, OcrResponse, PipelineInfo, TextResult};
pub use orientation::{Orientation, OrientationClassifier, OrientationStage};
pub use pool::{PipelineLease, PipelinePool};
pub use recognition::{Recognition, Recognizer};
