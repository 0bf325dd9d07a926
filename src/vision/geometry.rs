//! Planar geometry for detection postprocessing
//!
//! Rotated rectangles, convex hulls, the minimum-area enclosing rectangle
//! (rotating calipers) and rotated-rectangle overlap.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A point in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2f {
    pub x: f32,
    pub y: f32,
}

impl Point2f {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Scale each axis independently
    pub fn scaled(self, sx: f32, sy: f32) -> Self {
        Self::new(self.x * sx, self.y * sy)
    }
}

impl From<imageproc::point::Point<i32>> for Point2f {
    fn from(p: imageproc::point::Point<i32>) -> Self {
        Self::new(p.x as f32, p.y as f32)
    }
}

/// A rectangle rotated about its center; `angle` in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RotatedRect {
    pub center: Point2f,
    pub width: f32,
    pub height: f32,
    pub angle: f32,
}

impl RotatedRect {
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Corner points, consecutive around the perimeter
    pub fn corners(&self) -> [Point2f; 4] {
        let radians = self.angle.to_radians();
        let b = radians.cos() * 0.5;
        let a = radians.sin() * 0.5;
        let (cx, cy) = (self.center.x, self.center.y);
        let (w, h) = (self.width, self.height);

        let p0 = Point2f::new(cx - a * h - b * w, cy + b * h - a * w);
        let p1 = Point2f::new(cx + a * h - b * w, cy - b * h - a * w);
        let p2 = Point2f::new(2.0 * cx - p0.x, 2.0 * cy - p0.y);
        let p3 = Point2f::new(2.0 * cx - p1.x, 2.0 * cy - p1.y);
        [p0, p1, p2, p3]
    }

    /// Axis-aligned bounds of the corners as (x1, y1, x2, y2)
    pub fn bounding_box(&self) -> (f32, f32, f32, f32) {
        bounds(&self.corners())
    }
}

/// Axis-aligned bounds of a point set as (x1, y1, x2, y2)
pub fn bounds(points: &[Point2f]) -> (f32, f32, f32, f32) {
    points.iter().fold(
        (f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        |(x1, y1, x2, y2), p| (x1.min(p.x), y1.min(p.y), x2.max(p.x), y2.max(p.y)),
    )
}

/// Cross product of OA and OB
#[inline]
fn cross(o: Point2f, a: Point2f, b: Point2f) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Signed shoelace area; sign follows vertex winding
pub fn signed_area(polygon: &[Point2f]) -> f32 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for (i, p) in polygon.iter().enumerate() {
        let q = polygon[(i + 1) % polygon.len()];
        sum += p.x * q.y - q.x * p.y;
    }
    sum * 0.5
}

/// Unsigned polygon area
pub fn polygon_area(polygon: &[Point2f]) -> f32 {
    signed_area(polygon).abs()
}

/// Convex hull by Andrew's monotone chain, collinear points dropped
pub fn convex_hull(points: &[Point2f]) -> Vec<Point2f> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal))
    });
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut lower: Vec<Point2f> = Vec::with_capacity(pts.len());
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point2f> = Vec::with_capacity(pts.len());
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Minimum-area rectangle enclosing `points`
pub fn min_area_rect(points: &[Point2f]) -> RotatedRect {
    let hull = convex_hull(points);

    if hull.len() < 3 {
        // Empty, a single point or a segment
        return match hull.as_slice() {
            [] => RotatedRect::default(),
            [p] => RotatedRect {
                center: *p,
                ..RotatedRect::default()
            },
            [p, q, ..] => {
                let dx = q.x - p.x;
                let dy = q.y - p.y;
                RotatedRect {
                    center: Point2f::new((p.x + q.x) / 2.0, (p.y + q.y) / 2.0),
                    width: dx.hypot(dy),
                    height: 0.0,
                    angle: dy.atan2(dx).to_degrees(),
                }
            }
        };
    }

    let n = hull.len();
    let mut best = RotatedRect::default();
    let mut min_area = f32::INFINITY;

    for i in 0..n {
        let p1 = hull[i];
        let p2 = hull[(i + 1) % n];
        let (ex, ey) = (p2.x - p1.x, p2.y - p1.y);
        let len = ex.hypot(ey);
        if len < 1e-6 {
            continue;
        }

        let (ux, uy) = (ex / len, ey / len);
        let (vx, vy) = (-uy, ux);

        let mut min_u = f32::INFINITY;
        let mut max_u = f32::NEG_INFINITY;
        let mut min_v = f32::INFINITY;
        let mut max_v = f32::NEG_INFINITY;
        for p in &hull {
            let (dx, dy) = (p.x - p1.x, p.y - p1.y);
            let u = dx * ux + dy * uy;
            let v = dx * vx + dy * vy;
            min_u = min_u.min(u);
            max_u = max_u.max(u);
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }

        let width = max_u - min_u;
        let height = max_v - min_v;
        let area = width * height;
        if area < min_area {
            min_area = area;
            let cu = (min_u + max_u) / 2.0;
            let cv = (min_v + max_v) / 2.0;
            best = RotatedRect {
                center: Point2f::new(p1.x + cu * ux + cv * vx, p1.y + cu * uy + cv * vy),
                width,
                height,
                angle: uy.atan2(ux).to_degrees(),
            };
        }
    }

    best
}

/// Intersection of `line_a`-`line_b` with the segment `s`-`e`
fn intersect(s: Point2f, e: Point2f, line_a: Point2f, line_b: Point2f) -> Point2f {
    let (dx, dy) = (e.x - s.x, e.y - s.y);
    let (lx, ly) = (line_b.x - line_a.x, line_b.y - line_a.y);
    let denom = dx * ly - dy * lx;
    if denom.abs() < f32::EPSILON {
        return s;
    }
    let t = ((line_a.x - s.x) * ly - (line_a.y - s.y) * lx) / denom;
    Point2f::new(s.x + t * dx, s.y + t * dy)
}

/// Clip `subject` against the convex polygon `clip` (Sutherland-Hodgman)
pub fn clip_convex(subject: &[Point2f], clip: &[Point2f]) -> Vec<Point2f> {
    let mut clip = clip.to_vec();
    if signed_area(&clip) < 0.0 {
        clip.reverse();
    }

    let mut output = subject.to_vec();
    for i in 0..clip.len() {
        if output.is_empty() {
            break;
        }
        let a = clip[i];
        let b = clip[(i + 1) % clip.len()];
        let input = std::mem::take(&mut output);

        for j in 0..input.len() {
            let current = input[j];
            let previous = input[(j + input.len() - 1) % input.len()];
            let current_in = cross(a, b, current) >= 0.0;
            let previous_in = cross(a, b, previous) >= 0.0;

            if current_in {
                if !previous_in {
                    output.push(intersect(previous, current, a, b));
                }
                output.push(current);
            } else if previous_in {
                output.push(intersect(previous, current, a, b));
            }
        }
    }

    output
}

/// Intersection-over-union of two rotated rectangles
pub fn rotated_iou(a: &RotatedRect, b: &RotatedRect) -> f32 {
    let area_a = a.area();
    let area_b = b.area();
    if area_a <= 0.0 || area_b <= 0.0 {
        return 0.0;
    }

    let inter = polygon_area(&clip_convex(&a.corners(), &b.corners()));
    let union = area_a + area_b - inter;
    if union <= 0.0 {
        return 0.0;
    }
    (inter / union).clamp(0.0, 1.0)
}
