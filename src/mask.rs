//! Binary foreground masks produced by region segmentation.

use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgba, RgbaImage, RgbImage};

use crate::geometry::Size;

const FOREGROUND: u8 = 255;
const BACKGROUND: u8 = 0;

/// Binary grid, `true` where the food item is.
///
/// Stored as an 8-bit image so resampling goes through `imageops`.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentationMask {
    pixels: GrayImage,
}

impl SegmentationMask {
    /// All-background mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: GrayImage::from_pixel(width, height, Luma([BACKGROUND])),
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        Self {
            pixels: GrayImage::from_fn(width, height, |x, y| Luma([to_level(f(x, y))])),
        }
    }

    /// Build from a row-major boolean buffer.
    pub fn from_bools(width: u32, height: u32, values: &[bool]) -> Result<Self> {
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(anyhow!(
                "mask length mismatch: expected {}, got {}",
                expected,
                values.len()
            ));
        }
        let raw = values.iter().map(|&v| to_level(v)).collect();
        let pixels = GrayImage::from_raw(width, height, raw)
            .ok_or_else(|| anyhow!("mask buffer does not fit {}x{}", width, height))?;
        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.pixels.get_pixel(x, y).0[0] >= FOREGROUND / 2
    }

    pub fn set(&mut self, x: u32, y: u32, foreground: bool) {
        self.pixels.put_pixel(x, y, Luma([to_level(foreground)]));
    }

    /// Row-major foreground flags.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.pixels.pixels().map(|p| p.0[0] >= FOREGROUND / 2)
    }

    pub fn foreground_count(&self) -> usize {
        self.iter().filter(|&v| v).count()
    }

    /// Nearest-neighbour resample to `size`.
    pub fn resized(&self, size: Size) -> Self {
        if size == self.size() {
            return self.clone();
        }
        Self {
            pixels: imageops::resize(&self.pixels, size.width, size.height, FilterType::Nearest),
        }
    }

    /// Clear every background pixel of `image` to transparent black.
    ///
    /// The mask is resampled to the image size first.
    pub fn apply_to(&self, image: &RgbImage) -> RgbaImage {
        let mask = self.resized(Size::new(image.width(), image.height()));
        RgbaImage::from_fn(image.width(), image.height(), |x, y| {
            if mask.is_foreground(x, y) {
                let [r, g, b] = image.get_pixel(x, y).0;
                Rgba([r, g, b, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }
}

fn to_level(foreground: bool) -> u8 {
    if foreground {
        FOREGROUND
    } else {
        BACKGROUND
    }
}
