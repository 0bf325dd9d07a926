//! OCR pipeline
//!
//! Composes one detector and one recognizer: detect, crop each box,
//! recognize, fuse scores, filter, then order top to bottom.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::detection::{DetectionBox, Detector};
use super::dictionary::Dictionary;
use super::frame::Image;
use super::models::EngineMetadata;
use super::orientation::OrientationStage;
use super::recognition::Recognizer;
use crate::config::{DetectorConfig, OcrConfig, RecognizerConfig};
use crate::error::OcrError;

/// Recognitions scoring below this are dropped regardless of configuration
pub const MIN_RECOGNITION_SCORE: f32 = 0.1;

/// Single OCR result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextResult {
    /// Axis-aligned box [x1, y1, x2, y2] in source pixels
    pub bbox: [f32; 4],
    /// Recognized text
    pub text: String,
    /// max(detection score, recognition score)
    pub score: f32,
}

/// Response envelope: `{"results": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrResponse {
    pub results: Vec<TextResult>,
}

/// Pipeline description for the `info` command
#[derive(Debug, Clone, Serialize)]
pub struct PipelineInfo {
    pub name: String,
    pub version: String,
    pub detection: EngineMetadata,
    pub recognition: EngineMetadata,
    pub dictionary_size: usize,
    pub orientation_enabled: bool,
}

/// Detection + recognition pipeline
pub struct OcrPipeline {
    detector: Detector,
    recognizer: Recognizer,
    orientation: OrientationStage,
}

impl OcrPipeline {
    pub fn new(detector: Detector, recognizer: Recognizer) -> Self {
        Self {
            detector,
            recognizer,
            orientation: OrientationStage::Absent,
        }
    }

    /// Replace the orientation stage
    pub fn with_orientation(mut self, orientation: OrientationStage) -> Self {
        self.orientation = orientation;
        self
    }

    /// Validate the config, load the dictionary and both models
    pub fn from_config(config: &OcrConfig) -> Result<Self, OcrError> {
        let (det, rec) = config.validate()?;
        let dictionary = Arc::new(Dictionary::load(&config.dictionary.path)?);
        dictionary.check_expected_size(config.dictionary.expected_size);
        Self::from_parts(Arc::new(det), Arc::new(rec), dictionary)
    }

    /// Load both models around already-validated, shared configuration
    pub fn from_parts(
        det: Arc<DetectorConfig>,
        rec: Arc<RecognizerConfig>,
        dictionary: Arc<Dictionary>,
    ) -> Result<Self, OcrError> {
        let detector = Detector::from_config(det)?;
        let recognizer = Recognizer::from_config(rec, dictionary)?;
        info!("OCR pipeline initialized");
        Ok(Self::new(detector, recognizer))
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub fn recognizer(&self) -> &Recognizer {
        &self.recognizer
    }

    /// Run OCR on an image; never fails, an empty image yields no results
    pub fn infer(&self, image: &Image) -> Vec<TextResult> {
        if image.is_empty() {
            debug!("Empty image, nothing to recognize");
            return vec![];
        }

        let start = Instant::now();
        let boxes = self.detector.detect(image);
        if boxes.is_empty() {
            debug!("No text detected in {:?}", start.elapsed());
            return vec![];
        }

        let results = self.recognize_boxes(image, &boxes);
        debug!(
            "OCR complete in {:?}: {} boxes, {} results",
            start.elapsed(),
            boxes.len(),
            results.len()
        );
        results
    }

    /// Crop, recognize, fuse and order the given boxes
    pub fn recognize_boxes(&self, image: &Image, boxes: &[DetectionBox]) -> Vec<TextResult> {
        let mut results = Vec::with_capacity(boxes.len());

        for (index, b) in boxes.iter().enumerate() {
            let Some(crop) = crop_rect(b, image.width(), image.height())
                .and_then(|(x, y, w, h)| image.crop(x, y, w, h))
            else {
                warn!("Skipping box {} {:?}: crop is empty or outside the image", index, b.bbox());
                continue;
            };

            let crop = self.orientation.apply(crop);
            let recognition = self.recognizer.recognize(&crop);
            if recognition.is_empty() || recognition.score < MIN_RECOGNITION_SCORE {
                continue;
            }

            results.push(TextResult {
                bbox: b.bbox(),
                text: recognition.text,
                score: b.score.max(recognition.score),
            });
        }

        // Stable: equal tops keep detection order
        results.sort_by(|a, b| a.bbox[1].partial_cmp(&b.bbox[1]).unwrap_or(Ordering::Equal));
        results
    }

    /// Results wrapped in the response envelope
    pub fn infer_response(&self, image: &Image) -> OcrResponse {
        OcrResponse {
            results: self.infer(image),
        }
    }

    /// Results as `{"results": [{"bbox": [...], "text": ..., "score": ...}]}`
    pub fn infer_json(&self, image: &Image) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self.infer_response(image))
    }

    pub fn info(&self) -> PipelineInfo {
        PipelineInfo {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            detection: self.detector.metadata(),
            recognition: self.recognizer.metadata(),
            dictionary_size: self.recognizer.dictionary().len(),
            orientation_enabled: self.orientation.is_enabled(),
        }
    }
}

/// Integer crop (x, y, w, h) for a box, `None` when empty or outside the image
pub fn crop_rect(b: &DetectionBox, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let x = b.x1.trunc();
    let y = b.y1.trunc();
    let w = (b.x2 - b.x1).trunc();
    let h = (b.y2 - b.y1).trunc();

    if ![x, y, w, h].iter().all(|v| v.is_finite()) {
        return None;
    }
    if x < 0.0 || y < 0.0 || w <= 0.0 || h <= 0.0 {
        return None;
    }
    if x + w > width as f32 || y + h > height as f32 {
        return None;
    }

    Some((x as u32, y as u32, w as u32, h as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::orientation::{Orientation, OrientationClassifier};
    use crate::vision::test_support::{
        ctc_output, detector_config, empty_map, ink_engine, letters, paint_block, recognizer_config,
        solid_image, ScriptedEngine,
    };
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    const CLASSES: usize = 9;

    fn pipeline_with(
        detector_engine: impl crate::vision::models::InferenceEngine + 'static,
        rec_ids: &[usize],
        rec_prob: f32,
    ) -> OcrPipeline {
        let detector = Detector::new(Box::new(detector_engine), Arc::new(detector_config(4, 256)));
        let recognizer = Recognizer::new(
            Box::new(ScriptedEngine::new(vec![ctc_output(rec_ids, CLASSES, rec_prob)])),
            Arc::new(recognizer_config()),
            letters(),
        );
        OcrPipeline::new(detector, recognizer)
    }

    fn text_pipeline() -> OcrPipeline {
        pipeline_with(ScriptedEngine::new(vec![empty_map(8, 8)]), &[1, 2], 0.8)
    }

    #[test]
    fn test_blank_image_gives_no_results() {
        let pipeline = pipeline_with(ink_engine(), &[1], 0.9);
        assert!(pipeline.infer(&solid_image(120, 80, [255, 255, 255])).is_empty());
    }

    #[test]
    fn test_empty_image_gives_no_results() {
        let pipeline = text_pipeline();
        assert!(pipeline.infer(&solid_image(0, 0, [0, 0, 0])).is_empty());
    }

    #[test]
    fn test_end_to_end_orders_top_to_bottom() {
        let pipeline = pipeline_with(ink_engine(), &[3, 8, 5, 7], 0.9);
        let mut image = solid_image(200, 100, [255, 255, 255]);
        paint_block(&mut image, 20, 60, 80, 20);
        paint_block(&mut image, 110, 10, 70, 20);

        let results = pipeline.infer(&image);

        assert_eq!(results.len(), 2);
        assert!(results[0].bbox[1] < results[1].bbox[1]);
        assert!((results[0].bbox[1] - 10.0).abs() < 2.0);
        assert!(results.iter().all(|r| r.text == "CEG"));
    }

    #[test]
    fn test_skips_out_of_bounds_box() {
        let pipeline = text_pipeline();
        let image = solid_image(100, 100, [255, 255, 255]);
        let boxes = vec![
            DetectionBox::from_bbox(90.0, 10.0, 150.0, 30.0, 0.9),
            DetectionBox::from_bbox(10.0, 40.0, 60.0, 60.0, 0.9),
        ];

        let results = pipeline.recognize_boxes(&image, &boxes);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].bbox, [10.0, 40.0, 60.0, 60.0]);
        assert_eq!(results[0].text, "AB");
    }

    #[test]
    fn test_skips_degenerate_boxes() {
        let pipeline = text_pipeline();
        let image = solid_image(100, 100, [255, 255, 255]);
        let boxes = vec![
            DetectionBox::from_bbox(10.0, 10.0, 10.5, 30.0, 0.9),
            DetectionBox::from_bbox(-3.0, 10.0, 20.0, 30.0, 0.9),
        ];

        assert!(pipeline.recognize_boxes(&image, &boxes).is_empty());
    }

    #[test]
    fn test_orders_by_top_y() {
        let pipeline = text_pipeline();
        let image = solid_image(100, 100, [255, 255, 255]);
        let boxes: Vec<DetectionBox> = [50.0, 10.0, 30.0]
            .iter()
            .map(|&y| DetectionBox::from_bbox(5.0, y, 60.0, y + 8.0, 0.9))
            .collect();

        let results = pipeline.recognize_boxes(&image, &boxes);

        let tops: Vec<f32> = results.iter().map(|r| r.bbox[1]).collect();
        assert_eq!(tops, vec![10.0, 30.0, 50.0]);
    }

    #[test]
    fn test_equal_tops_keep_detection_order() {
        let pipeline = text_pipeline();
        let image = solid_image(100, 100, [255, 255, 255]);
        let boxes = vec![
            DetectionBox::from_bbox(50.0, 20.0, 90.0, 30.0, 0.9),
            DetectionBox::from_bbox(5.0, 20.0, 40.0, 30.0, 0.9),
        ];

        let results = pipeline.recognize_boxes(&image, &boxes);
        assert_eq!(results[0].bbox[0], 50.0);
        assert_eq!(results[1].bbox[0], 5.0);
    }

    #[test]
    fn test_score_fusion_takes_max() {
        let pipeline = text_pipeline();
        let image = solid_image(100, 100, [255, 255, 255]);
        let boxes = vec![
            DetectionBox::from_bbox(5.0, 10.0, 60.0, 20.0, 0.6),
            DetectionBox::from_bbox(5.0, 30.0, 60.0, 40.0, 0.95),
        ];

        let results = pipeline.recognize_boxes(&image, &boxes);

        assert!((results[0].score - 0.8).abs() < 1e-5);
        assert!((results[1].score - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_drops_empty_and_low_score_text() {
        // Only blanks decode to nothing
        let pipeline = pipeline_with(ScriptedEngine::new(vec![empty_map(8, 8)]), &[8, 8], 0.9);
        let image = solid_image(100, 100, [255, 255, 255]);
        let boxes = vec![DetectionBox::from_bbox(5.0, 10.0, 60.0, 20.0, 0.9)];
        assert!(pipeline.recognize_boxes(&image, &boxes).is_empty());

        // Confidence under the fixed floor, with gating relaxed below it
        let mut weak = ndarray::Array3::<f32>::zeros((1, 2, CLASSES));
        weak[[0, 0, 1]] = 0.05;
        weak[[0, 1, 2]] = 0.05;
        let mut config = recognizer_config();
        config.rec_threshold = 0.0;
        let recognizer = Recognizer::new(
            Box::new(ScriptedEngine::new(vec![weak.into_dyn()])),
            Arc::new(config),
            letters(),
        );
        let detector = Detector::new(
            Box::new(ScriptedEngine::new(vec![empty_map(8, 8)])),
            Arc::new(detector_config(4, 64)),
        );
        let pipeline = OcrPipeline::new(detector, recognizer);
        assert!(pipeline.recognize_boxes(&image, &boxes).is_empty());
    }

    #[test]
    fn test_orientation_stage_sees_every_crop() {
        struct Counting(Arc<AtomicUsize>);
        impl OrientationClassifier for Counting {
            fn classify(&self, _crop: &Image) -> Orientation {
                self.0.fetch_add(1, AtomicOrdering::SeqCst);
                Orientation::Rotated180
            }
        }

        let seen = Arc::new(AtomicUsize::new(0));
        let pipeline = text_pipeline()
            .with_orientation(OrientationStage::ModelBacked(Box::new(Counting(seen.clone()))));
        let image = solid_image(100, 100, [255, 255, 255]);
        let boxes = vec![
            DetectionBox::from_bbox(5.0, 10.0, 60.0, 20.0, 0.9),
            DetectionBox::from_bbox(5.0, 30.0, 60.0, 40.0, 0.9),
        ];

        assert_eq!(pipeline.recognize_boxes(&image, &boxes).len(), 2);
        assert_eq!(seen.load(AtomicOrdering::SeqCst), 2);
        assert!(pipeline.info().orientation_enabled);
    }

    #[test]
    fn test_crop_rect_truncates() {
        let b = DetectionBox::from_bbox(10.7, 5.2, 30.1, 25.9, 0.9);
        assert_eq!(crop_rect(&b, 100, 100), Some((10, 5, 19, 20)));
        assert_eq!(crop_rect(&b, 20, 100), None);
    }

    #[test]
    fn test_json_envelope() {
        let pipeline = pipeline_with(ink_engine(), &[1], 0.9);
        let mut image = solid_image(200, 100, [255, 255, 255]);
        paint_block(&mut image, 20, 20, 80, 20);

        let json = pipeline.infer_json(&image).unwrap();

        let results = json["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["text"], "A");
        assert_eq!(results[0]["bbox"].as_array().unwrap().len(), 4);
        assert!(results[0]["score"].as_f64().unwrap() > 0.5);
    }

    #[test]
    fn test_info_reports_dictionary() {
        let info = text_pipeline().info();
        assert_eq!(info.dictionary_size, 7);
        assert!(!info.orientation_enabled);
    }
}
