//! Optional text-line orientation stage
//!
//! Sits between cropping and recognition. Absent by default; a
//! model-backed stage asks a classifier whether the crop is upside down.

use super::frame::Image;

/// Orientation of a cropped text line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Upright,
    Rotated180,
}

/// Decides whether a crop needs flipping before recognition
pub trait OrientationClassifier: Send + Sync {
    fn classify(&self, crop: &Image) -> Orientation;
}

/// The orientation stage of a pipeline
#[derive(Default)]
pub enum OrientationStage {
    /// Crops go to recognition unchanged
    #[default]
    Absent,
    /// Crops classified as upside down are rotated 180 degrees
    ModelBacked(Box<dyn OrientationClassifier>),
}

impl OrientationStage {
    pub fn is_enabled(&self) -> bool {
        matches!(self, OrientationStage::ModelBacked(_))
    }

    /// Return the crop as recognition should see it
    pub fn apply(&self, crop: Image) -> Image {
        match self {
            OrientationStage::Absent => crop,
            OrientationStage::ModelBacked(classifier) => match classifier.classify(&crop) {
                Orientation::Upright => crop,
                Orientation::Rotated180 => crop.rotate180(),
            },
        }
    }
}

impl std::fmt::Debug for OrientationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrientationStage::Absent => write!(f, "Absent"),
            OrientationStage::ModelBacked(_) => write!(f, "ModelBacked"),
        }
    }
}
