//! DB text-detection postprocessing
//!
//! Turns the detector's probability map into scored rotated rectangles:
//! binarize, close with a 2x2 element, take external contours, fit a
//! minimum-area rectangle to each, then run rotated NMS. Coordinates stay in
//! probability-map space; the detector rescales them.

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use ndarray::ArrayView2;
use std::cmp::Ordering;
use tracing::debug;

use super::geometry::{bounds, min_area_rect, polygon_area, rotated_iou, Point2f, RotatedRect};
use crate::config::{BoxScore, DetectorConfig};

/// Contours enclosing less than this many square pixels are noise
pub const MIN_CONTOUR_AREA: f32 = 10.0;

/// A rotated rectangle in probability-map space with its score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub rect: RotatedRect,
    pub score: f32,
}

/// DB postprocessor
#[derive(Debug, Clone)]
pub struct DbPostProcessor {
    threshold: f32,
    nms_threshold: f32,
    min_size: f32,
    box_score: BoxScore,
}

impl DbPostProcessor {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            threshold: config.det_threshold,
            nms_threshold: config.nms_threshold,
            min_size: config.min_size as f32,
            box_score: config.box_score,
        }
    }

    /// Extract suppressed candidates from a probability map
    pub fn process(&self, prob: ArrayView2<f32>) -> Vec<Candidate> {
        let mask = close_2x2(&binarize(prob, self.threshold));
        let contours = external_contours(&mask);

        let mut candidates = Vec::with_capacity(contours.len());
        for contour in &contours {
            if polygon_area(contour) < MIN_CONTOUR_AREA {
                continue;
            }

            let rect = min_area_rect(contour);
            if rect.width < self.min_size || rect.height < self.min_size {
                continue;
            }

            let score = match self.box_score {
                BoxScore::MeanProbability => mean_probability(prob, &rect.corners()),
                BoxScore::Constant(score) => score,
            };
            candidates.push(Candidate { rect, score });
        }

        let keep = non_maximum_suppression(&candidates, self.threshold, self.nms_threshold);
        debug!(
            "DB postprocess: {} contours, {} candidates, {} kept",
            contours.len(),
            candidates.len(),
            keep.len()
        );

        keep.into_iter().map(|i| candidates[i]).collect()
    }
}

/// Pixels strictly above `threshold` become 255, all others 0
pub fn binarize(prob: ArrayView2<f32>, threshold: f32) -> GrayImage {
    let (height, width) = prob.dim();
    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let on = prob[[y as usize, x as usize]] > threshold;
        Luma([if on { 255 } else { 0 }])
    })
}

/// 2x2 dilation anchored at the top-left of the window
pub fn dilate_2x2(img: &GrayImage) -> GrayImage {
    let (width, height) = img.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let mut value = img.get_pixel(x, y).0[0];
        if x > 0 {
            value = value.max(img.get_pixel(x - 1, y).0[0]);
        }
        if y > 0 {
            value = value.max(img.get_pixel(x, y - 1).0[0]);
        }
        if x > 0 && y > 0 {
            value = value.max(img.get_pixel(x - 1, y - 1).0[0]);
        }
        Luma([value])
    })
}

/// 2x2 erosion, the reflection of [`dilate_2x2`]; out-of-image pixels are ignored
pub fn erode_2x2(img: &GrayImage) -> GrayImage {
    let (width, height) = img.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let mut value = img.get_pixel(x, y).0[0];
        if x + 1 < width {
            value = value.min(img.get_pixel(x + 1, y).0[0]);
        }
        if y + 1 < height {
            value = value.min(img.get_pixel(x, y + 1).0[0]);
        }
        if x + 1 < width && y + 1 < height {
            value = value.min(img.get_pixel(x + 1, y + 1).0[0]);
        }
        Luma([value])
    })
}

/// Morphological closing with a 2x2 rectangle
pub fn close_2x2(img: &GrayImage) -> GrayImage {
    erode_2x2(&dilate_2x2(img))
}

/// Outermost contours of the foreground, as pixel-center points
pub fn external_contours(mask: &GrayImage) -> Vec<Vec<Point2f>> {
    let contours: Vec<Contour<i32>> = find_contours(mask);
    contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| c.points.into_iter().map(Point2f::from).collect())
        .collect()
}

/// Scanline fill of a polygon into `mask`
pub fn fill_polygon(mask: &mut GrayImage, points: &[Point2f], value: u8) {
    let (width, height) = mask.dimensions();
    if points.len() < 3 || width == 0 || height == 0 {
        return;
    }

    let (_, y1, _, y2) = bounds(points);
    let min_y = (y1.floor() as i64).max(0);
    let max_y = (y2.ceil() as i64).min(height as i64 - 1);

    let mut crossings = Vec::with_capacity(points.len());
    for y in min_y..=max_y {
        let scan = y as f32 + 0.5;
        crossings.clear();

        for (i, &p1) in points.iter().enumerate() {
            let p2 = points[(i + 1) % points.len()];
            if (p1.y <= scan && p2.y > scan) || (p2.y <= scan && p1.y > scan) {
                let t = (scan - p1.y) / (p2.y - p1.y);
                crossings.push(p1.x + t * (p2.x - p1.x));
            }
        }
        crossings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        for pair in crossings.chunks_exact(2) {
            let start = (pair[0].floor() as i64).max(0);
            let end = (pair[1].ceil() as i64).min(width as i64 - 1);
            for x in start..=end {
                mask.put_pixel(x as u32, y as u32, Luma([value]));
            }
        }
    }
}

/// Mean probability over the filled polygon, clipped to the map
pub fn mean_probability(prob: ArrayView2<f32>, polygon: &[Point2f]) -> f32 {
    let (height, width) = prob.dim();
    if width == 0 || height == 0 {
        return 0.0;
    }

    let (x1, y1, x2, y2) = bounds(polygon);
    let min_x = (x1.floor() as i64).clamp(0, width as i64 - 1);
    let max_x = (x2.ceil() as i64).clamp(0, width as i64 - 1);
    let min_y = (y1.floor() as i64).clamp(0, height as i64 - 1);
    let max_y = (y2.ceil() as i64).clamp(0, height as i64 - 1);

    let mut mask = GrayImage::new((max_x - min_x + 1) as u32, (max_y - min_y + 1) as u32);
    let local: Vec<Point2f> = polygon
        .iter()
        .map(|p| Point2f::new(p.x - min_x as f32, p.y - min_y as f32))
        .collect();
    fill_polygon(&mut mask, &local, 1);

    let mut sum = 0.0;
    let mut count = 0usize;
    for (dx, dy, pixel) in mask.enumerate_pixels() {
        if pixel.0[0] > 0 {
            sum += prob[[min_y as usize + dy as usize, min_x as usize + dx as usize]];
            count += 1;
        }
    }

    if count > 0 {
        sum / count as f32
    } else {
        0.0
    }
}

/// Rotated-rectangle NMS
///
/// Candidates scoring above `score_threshold` are visited in descending score
/// order (ties keep input order); one is kept when its IoU with every kept
/// candidate is at most `nms_threshold`. Returns kept indices in visit order.
pub fn non_maximum_suppression(
    candidates: &[Candidate],
    score_threshold: f32,
    nms_threshold: f32,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len())
        .filter(|&i| candidates[i].score > score_threshold)
        .collect();
    order.sort_by(|&a, &b| {
        candidates[b]
            .score
            .partial_cmp(&candidates[a].score)
            .unwrap_or(Ordering::Equal)
    });

    let mut keep: Vec<usize> = Vec::new();
    for i in order {
        let overlaps = keep
            .iter()
            .any(|&k| rotated_iou(&candidates[k].rect, &candidates[i].rect) > nms_threshold);
        if !overlaps {
            keep.push(i);
        }
    }

    keep
}
