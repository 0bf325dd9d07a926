//! Image preprocessing for OCR models
//!
//! Handles resizing, padding, normalization and tensor conversion for the
//! detection and recognition models.

use image::RgbImage;
use ndarray::{s, Array3, Array4, Axis};

use super::frame::{ChannelOrder, Image};
use crate::config::{DetectorConfig, Normalization, RecognizerConfig};

/// Recognition inputs are padded to a multiple of this width
pub const REC_WIDTH_ALIGN: u32 = 32;

/// Resize bookkeeping for mapping detections back to the source image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeInfo {
    /// Scale factor `s` before clamping
    pub scale: f64,
    pub source_width: u32,
    pub source_height: u32,
    pub resized_width: u32,
    pub resized_height: u32,
    /// Side of the square, zero-padded canvas
    pub padded_size: u32,
}

impl ResizeInfo {
    /// Horizontal factor from resized pixels back to source pixels
    pub fn inverse_x(&self) -> f32 {
        self.source_width as f32 / self.resized_width as f32
    }

    /// Vertical factor from resized pixels back to source pixels
    pub fn inverse_y(&self) -> f32 {
        self.source_height as f32 / self.resized_height as f32
    }
}

/// Scale that brings the short side up to `min_size` or the long side to `max_size`,
/// whichever is larger
pub fn detection_scale(width: u32, height: u32, min_size: u32, max_size: u32) -> f64 {
    let short = width.min(height) as f64;
    let long = width.max(height) as f64;
    (min_size as f64 / short).max(max_size as f64 / long)
}

/// Resize preserving aspect ratio, clamped so no side exceeds `max_size`
pub fn resize_for_detection(image: &Image, min_size: u32, max_size: u32) -> (Image, ResizeInfo) {
    let (width, height) = image.dimensions();
    let scale = detection_scale(width, height, min_size, max_size);

    let resized_width = ((width as f64 * scale) as u32).clamp(1, max_size);
    let resized_height = ((height as f64 * scale) as u32).clamp(1, max_size);
    let resized = image.resize(resized_width, resized_height);

    let info = ResizeInfo {
        scale,
        source_width: width,
        source_height: height,
        resized_width,
        resized_height,
        padded_size: max_size,
    };

    (resized, info)
}

/// Convert RGB pixels to an HWC f32 array in [0, 1], zero-padded on the
/// bottom/right to `canvas_width` x `canvas_height`
pub fn rgb_to_f32(rgb: &RgbImage, canvas_width: u32, canvas_height: u32) -> Array3<f32> {
    let mut out = Array3::<f32>::zeros((canvas_height as usize, canvas_width as usize, 3));

    let width = rgb.width().min(canvas_width);
    let height = rgb.height().min(canvas_height);
    for y in 0..height {
        for x in 0..width {
            let pixel = rgb.get_pixel(x, y).0;
            for c in 0..3 {
                out[[y as usize, x as usize, c]] = pixel[c] as f32 / 255.0;
            }
        }
    }

    out
}

/// Grayscale (0.299R + 0.587G + 0.114B) replicated into three channels,
/// zero-padded on the right to `canvas_width`
pub fn gray_to_f32(rgb: &RgbImage, canvas_width: u32) -> Array3<f32> {
    let height = rgb.height();
    let mut out = Array3::<f32>::zeros((height as usize, canvas_width as usize, 3));

    let width = rgb.width().min(canvas_width);
    for y in 0..height {
        for x in 0..width {
            let [r, g, b] = rgb.get_pixel(x, y).0;
            let luma = (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32)
                .round()
                .min(255.0);
            let value = luma / 255.0;
            for c in 0..3 {
                out[[y as usize, x as usize, c]] = value;
            }
        }
    }

    out
}

/// Normalize an RGB-ordered HWC image with per-channel mean and std
pub fn normalize(image: &mut Array3<f32>, normalization: &Normalization) {
    for (c, mut plane) in image.axis_iter_mut(Axis(2)).enumerate() {
        let mean = normalization.mean[c];
        let std = normalization.std[c];
        plane.mapv_inplace(|v| (v - mean) / std);
    }
}

/// Convert an RGB-ordered HWC image to an NCHW tensor (batch size 1) with
/// planes in `order`
pub fn hwc_to_nchw(image: &Array3<f32>, order: ChannelOrder) -> Array4<f32> {
    let (h, w, c) = image.dim();
    let mut tensor = Array4::<f32>::zeros((1, c, h, w));

    for plane in 0..c {
        let source = match order {
            ChannelOrder::Rgb => plane,
            ChannelOrder::Bgr => c - 1 - plane,
        };
        tensor
            .slice_mut(s![0, plane, .., ..])
            .assign(&image.index_axis(Axis(2), source));
    }

    tensor
}

/// Full preprocessing pipeline for detection
///
/// Returns `None` for an empty image.
pub fn preprocess_for_detection(
    image: &Image,
    config: &DetectorConfig,
) -> Option<(Array4<f32>, ResizeInfo)> {
    if image.is_empty() {
        return None;
    }

    // 1. Resize, clamping to max_size
    let (resized, info) = resize_for_detection(image, config.min_size, config.max_size);

    // 2. Pad to a square canvas and scale to [0, 1]
    let mut hwc = rgb_to_f32(&resized.to_rgb(), info.padded_size, info.padded_size);

    // 3. Normalize
    normalize(&mut hwc, &config.normalization);

    // 4. Reorder channels and pack as NCHW
    Some((hwc_to_nchw(&hwc, config.channel_order), info))
}

/// Target width for a crop scaled to `target_height`, capped at `max_width`
pub fn recognition_width(width: u32, height: u32, target_height: u32, max_width: u32) -> u32 {
    let ratio = target_height as f64 / height as f64;
    ((width as f64 * ratio) as u32).clamp(1, max_width)
}

/// Round `width` up to the next multiple of [`REC_WIDTH_ALIGN`]
pub fn padded_width(width: u32) -> u32 {
    width.div_ceil(REC_WIDTH_ALIGN) * REC_WIDTH_ALIGN
}

/// Full preprocessing pipeline for recognition
///
/// Returns `None` for an empty crop.
pub fn preprocess_for_recognition(crop: &Image, config: &RecognizerConfig) -> Option<Array4<f32>> {
    if crop.is_empty() {
        return None;
    }

    let (width, height) = crop.dimensions();
    let target_width = recognition_width(width, height, config.image_height, config.max_width);
    let resized = crop.resize(target_width, config.image_height);

    let mut hwc = gray_to_f32(&resized.to_rgb(), padded_width(target_width));
    normalize(&mut hwc, &config.normalization);

    Some(hwc_to_nchw(&hwc, config.channel_order))
}
