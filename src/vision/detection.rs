//! Text detection
//!
//! Runs the DB detection model on a resized, padded image and maps the
//! resulting boxes back into source-image pixels.

use ndarray::{Array2, ArrayD};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use super::db_postprocess::DbPostProcessor;
use super::frame::Image;
use super::geometry::{bounds, Point2f, RotatedRect};
use super::models::{EngineMetadata, InferenceEngine, OnnxEngine};
use super::preprocess::{preprocess_for_detection, ResizeInfo};
use crate::config::DetectorConfig;
use crate::error::OcrError;

/// A detected text region in source-image pixels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionBox {
    /// Corners of the rotated rectangle
    pub corners: [Point2f; 4],
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    /// Confidence in [0, 1]
    pub score: f32,
}

impl DetectionBox {
    /// Axis-aligned box from four corners
    pub fn from_corners(corners: [Point2f; 4], score: f32) -> Self {
        let (x1, y1, x2, y2) = bounds(&corners);
        Self {
            corners,
            x1,
            y1,
            x2,
            y2,
            score,
        }
    }

    /// Axis-aligned rectangle (x1, y1, x2, y2) with an upright-rectangle corner set
    pub fn from_bbox(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        let corners = [
            Point2f::new(x1, y1),
            Point2f::new(x2, y1),
            Point2f::new(x2, y2),
            Point2f::new(x1, y2),
        ];
        Self::from_corners(corners, score)
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Bounding box as [x1, y1, x2, y2]
    pub fn bbox(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// Text detector: one engine session behind one lock
pub struct Detector {
    engine: Mutex<Box<dyn InferenceEngine>>,
    config: Arc<DetectorConfig>,
    postprocessor: DbPostProcessor,
}

impl Detector {
    /// Create a detector around an existing engine
    pub fn new(engine: Box<dyn InferenceEngine>, config: Arc<DetectorConfig>) -> Self {
        let postprocessor = DbPostProcessor::new(&config);
        Self {
            engine: Mutex::new(engine),
            config,
            postprocessor,
        }
    }

    /// Load the ONNX detection model named in the config
    pub fn from_config(config: Arc<DetectorConfig>) -> Result<Self, OcrError> {
        let engine = OnnxEngine::new("detection", &config.model_path, config.intra_threads)?;
        engine.check_names(&config.input_names, &config.output_names)?;

        info!(
            "Detector ready: min_size={}, max_size={}, thresh={}, nms_thresh={}, box_score={:?}",
            config.min_size,
            config.max_size,
            config.det_threshold,
            config.nms_threshold,
            config.box_score
        );

        Ok(Self::new(Box::new(engine), config))
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Describe the underlying model
    pub fn metadata(&self) -> EngineMetadata {
        self.engine.lock().metadata()
    }

    /// Detect text boxes; failures yield an empty list
    pub fn detect(&self, image: &Image) -> Vec<DetectionBox> {
        let start = Instant::now();
        let mut engine = self.engine.lock();

        let Some((tensor, info)) = preprocess_for_detection(image, &self.config) else {
            debug!("Skipping detection on empty image");
            return vec![];
        };

        if !self.config.input_shape.accepts(tensor.shape()) {
            error!(
                "Detection tensor {:?} does not match template {:?}",
                tensor.shape(),
                self.config.input_shape.dims()
            );
            return vec![];
        }

        let outputs = match engine.run(&tensor, &self.config.input_names, &self.config.output_names) {
            Ok(outputs) => outputs,
            Err(e) => {
                error!("Detection inference failed: {}", e);
                return vec![];
            }
        };

        let Some(prob) = outputs.first().and_then(probability_map) else {
            error!("Detection model returned no usable probability map");
            return vec![];
        };

        let candidates = self.postprocessor.process(prob.view());
        let (sx, sy) = map_to_source_scale(prob.dim(), &info);
        let boxes: Vec<DetectionBox> = candidates
            .iter()
            .map(|c| rescale(&c.rect, c.score, sx, sy))
            .collect();

        debug!("Detected {} text boxes in {:?}", boxes.len(), start.elapsed());
        boxes
    }
}

/// First H x W plane of the model output
fn probability_map(output: &ArrayD<f32>) -> Option<Array2<f32>> {
    let shape = output.shape();
    if shape.len() < 2 {
        return None;
    }
    let height = shape[shape.len() - 2];
    let width = shape[shape.len() - 1];
    if height == 0 || width == 0 {
        return None;
    }

    let plane: Vec<f32> = output.iter().copied().take(height * width).collect();
    Array2::from_shape_vec((height, width), plane).ok()
}

/// Per-axis factors from probability-map pixels to source pixels
fn map_to_source_scale((map_height, map_width): (usize, usize), info: &ResizeInfo) -> (f32, f32) {
    let to_tensor_x = info.padded_size as f32 / map_width as f32;
    let to_tensor_y = info.padded_size as f32 / map_height as f32;
    (to_tensor_x * info.inverse_x(), to_tensor_y * info.inverse_y())
}

fn rescale(rect: &RotatedRect, score: f32, sx: f32, sy: f32) -> DetectionBox {
    DetectionBox::from_corners(rect.corners().map(|p| p.scaled(sx, sy)), score)
}
