//! Image buffers handed to the OCR pipeline

use image::{imageops, imageops::FilterType, DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::Path;

/// Channel order of a packed 3-channel pixel buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

/// An image captured for one request
///
/// Pixels are stored as raw triplets in `order`; the buffer is never mutated
/// after construction; crops and resizes produce new images.
#[derive(Debug, Clone)]
pub struct Image {
    pixels: RgbImage,
    order: ChannelOrder,
}

impl Image {
    /// Wrap packed pixel data, `None` if the buffer length does not match
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>, order: ChannelOrder) -> Option<Self> {
        RgbImage::from_raw(width, height, data).map(|pixels| Self { pixels, order })
    }

    /// Wrap an RGB buffer
    pub fn from_rgb(pixels: RgbImage) -> Self {
        Self {
            pixels,
            order: ChannelOrder::Rgb,
        }
    }

    /// Convert any decoded image to RGB
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self::from_rgb(image.to_rgb8())
    }

    /// Decode an image file
    pub fn open(path: &Path) -> Result<Self, image::ImageError> {
        Ok(Self::from_dynamic(&image::open(path)?))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Get image dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn channels(&self) -> usize {
        3
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    /// True when either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Pixels in RGB order, borrowed when no swap is needed
    pub fn to_rgb(&self) -> Cow<'_, RgbImage> {
        match self.order {
            ChannelOrder::Rgb => Cow::Borrowed(&self.pixels),
            ChannelOrder::Bgr => {
                let mut rgb = self.pixels.clone();
                for pixel in rgb.pixels_mut() {
                    pixel.0.swap(0, 2);
                }
                Cow::Owned(rgb)
            }
        }
    }

    /// Copy out a rectangle, `None` if it is empty or leaves the image
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Option<Image> {
        if width == 0 || height == 0 {
            return None;
        }
        let right = x.checked_add(width)?;
        let bottom = y.checked_add(height)?;
        if right > self.width() || bottom > self.height() {
            return None;
        }

        let pixels = imageops::crop_imm(&self.pixels, x, y, width, height).to_image();
        Some(Self {
            pixels,
            order: self.order,
        })
    }

    /// Bilinear resize, keeping the channel order
    pub fn resize(&self, width: u32, height: u32) -> Image {
        if (width, height) == self.dimensions() {
            return self.clone();
        }
        Self {
            pixels: imageops::resize(&self.pixels, width, height, FilterType::Triangle),
            order: self.order,
        }
    }

    /// Rotate by 180 degrees
    pub fn rotate180(&self) -> Image {
        Self {
            pixels: imageops::rotate180(&self.pixels),
            order: self.order,
        }
    }
}
