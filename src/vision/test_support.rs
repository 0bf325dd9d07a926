//! Scripted engines and fixtures shared by the unit tests

use image::RgbImage;
use ndarray::{Array3, Array4, ArrayD, IxDyn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::dictionary::Dictionary;
use super::frame::{ChannelOrder, Image};
use super::models::InferenceEngine;
use crate::config::{Normalization, OcrConfig, DetectorConfig, RecognizerConfig};
use crate::error::InferenceError;

/// Returns the same outputs on every call
pub(crate) struct ScriptedEngine {
    outputs: Vec<ArrayD<f32>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    pub(crate) fn new(outputs: Vec<ArrayD<f32>>) -> Self {
        Self {
            outputs,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared call counter
    pub(crate) fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl InferenceEngine for ScriptedEngine {
    fn run(
        &mut self,
        _input: &Array4<f32>,
        _input_names: &[String],
        _output_names: &[String],
    ) -> Result<Vec<ArrayD<f32>>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.outputs.clone())
    }
}

/// Computes its output from the input tensor
pub(crate) struct FnEngine<F> {
    f: F,
}

impl<F> FnEngine<F>
where
    F: FnMut(&Array4<f32>) -> Result<Vec<ArrayD<f32>>, InferenceError> + Send,
{
    pub(crate) fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> InferenceEngine for FnEngine<F>
where
    F: FnMut(&Array4<f32>) -> Result<Vec<ArrayD<f32>>, InferenceError> + Send,
{
    fn run(
        &mut self,
        input: &Array4<f32>,
        _input_names: &[String],
        _output_names: &[String],
    ) -> Result<Vec<ArrayD<f32>>, InferenceError> {
        (self.f)(input)
    }
}

/// Always fails
pub(crate) struct FailingEngine;

impl InferenceEngine for FailingEngine {
    fn run(
        &mut self,
        _input: &Array4<f32>,
        _input_names: &[String],
        _output_names: &[String],
    ) -> Result<Vec<ArrayD<f32>>, InferenceError> {
        Err(InferenceError::Run("scripted failure".to_string()))
    }
}

/// Detector config with identity normalization and RGB planes, so tensor
/// values are raw RGB in [0, 1]
pub(crate) fn detector_config(min_size: u32, max_size: u32) -> DetectorConfig {
    let mut config = OcrConfig::default().detector_config().expect("default config is valid");
    config.normalization = Normalization {
        mean: [0.0; 3],
        std: [1.0; 3],
    };
    config.channel_order = ChannelOrder::Rgb;
    config.min_size = min_size;
    config.max_size = max_size;
    config
}

pub(crate) fn recognizer_config() -> RecognizerConfig {
    OcrConfig::default()
        .recognizer_config()
        .expect("default config is valid")
}

/// Marks red-ink pixels (high R, low G) as text. White paper and zero
/// padding both read as background.
pub(crate) fn ink_engine() -> impl InferenceEngine {
    FnEngine::new(|input: &Array4<f32>| {
        let (_, _, height, width) = input.dim();
        let mut map = Array4::<f32>::zeros((1, 1, height, width));
        for y in 0..height {
            for x in 0..width {
                let r = input[[0, 0, y, x]];
                let g = input[[0, 1, y, x]];
                if r > 0.5 && g < 0.5 {
                    map[[0, 0, y, x]] = 1.0;
                }
            }
        }
        Ok(vec![map.into_dyn()])
    })
}

/// CTC output of shape [1, T, C] whose per-step arg-max follows `ids`
pub(crate) fn ctc_output(ids: &[usize], classes: usize, prob: f32) -> ArrayD<f32> {
    let rest = (1.0 - prob) / (classes - 1) as f32;
    let mut output = Array3::<f32>::from_elem((1, ids.len(), classes), rest);
    for (t, &id) in ids.iter().enumerate() {
        output[[0, t, id]] = prob;
    }
    output.into_dyn()
}

/// Glyphs "A" through "G"
pub(crate) fn letters() -> Arc<Dictionary> {
    let glyphs = ["A", "B", "C", "D", "E", "F", "G"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    Arc::new(Dictionary::from_glyphs(glyphs).expect("non-empty"))
}

pub(crate) fn solid_image(width: u32, height: u32, rgb: [u8; 3]) -> Image {
    Image::from_rgb(RgbImage::from_pixel(width, height, image::Rgb(rgb)))
}

/// Paint a red block of `width` x `height` at (x, y)
pub(crate) fn paint_block(image: &mut Image, x: u32, y: u32, width: u32, height: u32) {
    let mut rgb = image.to_rgb().into_owned();
    for py in y..y + height {
        for px in x..x + width {
            rgb.put_pixel(px, py, image::Rgb([255, 0, 0]));
        }
    }
    *image = Image::from_rgb(rgb);
}

/// An empty [1, 1, H, W] output
pub(crate) fn empty_map(height: usize, width: usize) -> ArrayD<f32> {
    ArrayD::<f32>::zeros(IxDyn(&[1, 1, height, width]))
}
