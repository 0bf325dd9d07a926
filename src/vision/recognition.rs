//! Text recognition
//!
//! Recognizes a single cropped text line with a CTC model: grayscale,
//! fixed-height, dynamic-width input; greedy decode against a dictionary.

use ndarray::{ArrayD, ArrayView2};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::dictionary::Dictionary;
use super::frame::Image;
use super::models::{EngineMetadata, InferenceEngine, OnnxEngine};
use super::preprocess::preprocess_for_recognition;
use crate::config::RecognizerConfig;
use crate::error::OcrError;

/// Decoded text and its mean per-step confidence
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Recognition {
    pub text: String,
    pub score: f32,
}

impl Recognition {
    /// Empty text with score 0
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Text recognizer: one engine session behind one lock
pub struct Recognizer {
    engine: Mutex<Box<dyn InferenceEngine>>,
    config: Arc<RecognizerConfig>,
    dictionary: Arc<Dictionary>,
}

impl Recognizer {
    /// Create a recognizer around an existing engine
    pub fn new(
        engine: Box<dyn InferenceEngine>,
        config: Arc<RecognizerConfig>,
        dictionary: Arc<Dictionary>,
    ) -> Self {
        Self {
            engine: Mutex::new(engine),
            config,
            dictionary,
        }
    }

    /// Load the ONNX recognition model named in the config
    pub fn from_config(config: Arc<RecognizerConfig>, dictionary: Arc<Dictionary>) -> Result<Self, OcrError> {
        let engine = OnnxEngine::new("recognition", &config.model_path, config.intra_threads)?;
        engine.check_names(&config.input_names, &config.output_names)?;

        info!(
            "Recognizer ready: height={}, max_width={}, thresh={}, max_len={}, dictionary={}",
            config.image_height,
            config.max_width,
            config.rec_threshold,
            config.max_text_length,
            dictionary.len()
        );

        Ok(Self::new(Box::new(engine), config, dictionary))
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Describe the underlying model
    pub fn metadata(&self) -> EngineMetadata {
        self.engine.lock().metadata()
    }

    /// Recognize one crop; every failure yields empty text with score 0
    pub fn recognize(&self, crop: &Image) -> Recognition {
        let mut engine = self.engine.lock();

        let Some(tensor) = preprocess_for_recognition(crop, &self.config) else {
            debug!("Skipping recognition on empty crop");
            return Recognition::empty();
        };

        if !self.config.input_shape.accepts(tensor.shape()) {
            error!(
                "Recognition tensor {:?} does not match template {:?}",
                tensor.shape(),
                self.config.input_shape.dims()
            );
            return Recognition::empty();
        }

        let outputs = match engine.run(&tensor, &self.config.input_names, &self.config.output_names) {
            Ok(outputs) => outputs,
            Err(e) => {
                error!("Recognition inference failed: {}", e);
                return Recognition::empty();
            }
        };

        let Some(decoded) = outputs.first().and_then(|output| self.decode(output)) else {
            warn!("Recognition output could not be decoded");
            return Recognition::empty();
        };

        if decoded.score < self.config.rec_threshold {
            debug!(
                "Dropping {:?}: confidence {:.3} below {}",
                decoded.text, decoded.score, self.config.rec_threshold
            );
            return Recognition::empty();
        }

        debug!("Recognized {:?} ({:.3})", decoded.text, decoded.score);
        decoded
    }

    /// Greedy-decode a [T, C] or [1, T, C] output, before confidence gating
    pub fn decode(&self, output: &ArrayD<f32>) -> Option<Recognition> {
        let (steps, classes) = match output.shape() {
            &[t, c] => (t, c),
            &[1, t, c] => (t, c),
            _ => return None,
        };
        if steps == 0 || classes == 0 {
            return None;
        }

        let values: Vec<f32> = output.iter().copied().collect();
        let probs = ArrayView2::from_shape((steps, classes), values.as_slice()).ok()?;

        let (ids, score) = greedy_argmax(probs);
        let blank = classes - 1;
        let text: String = ctc_greedy_decode(&ids, blank, &self.dictionary)
            .chars()
            .take(self.config.max_text_length)
            .collect();

        Some(Recognition { text, score })
    }
}

/// Per-step arg-max ids and the mean of the per-step maxima
///
/// Ties resolve to the lowest class id.
pub fn greedy_argmax(probs: ArrayView2<f32>) -> (Vec<usize>, f32) {
    let steps = probs.nrows();
    let mut ids = Vec::with_capacity(steps);
    let mut score = 0.0f32;

    for row in probs.rows() {
        let mut best = 0usize;
        let mut best_p = f32::NEG_INFINITY;
        for (class, &p) in row.iter().enumerate() {
            if p > best_p {
                best_p = p;
                best = class;
            }
        }
        ids.push(best);
        score += best_p / steps as f32;
    }

    (ids, score)
}

/// CTC greedy collapse
///
/// Blank steps are dropped without resetting the previous id, so repeats
/// separated only by blanks collapse too. Ids outside `1..=dictionary.len()`
/// emit nothing but still count as the previous id.
pub fn ctc_greedy_decode(ids: &[usize], blank: usize, dictionary: &Dictionary) -> String {
    let mut text = String::new();
    let mut previous: Option<usize> = None;

    for &id in ids {
        if id == blank || previous == Some(id) {
            continue;
        }
        previous = Some(id);
        if let Some(glyph) = dictionary.glyph(id) {
            text.push_str(glyph);
        }
    }

    text
}
