use anyhow::{anyhow, Result};
use image::{GrayImage, Luma};

use crate::geometry::{PixelRect, Size};

/// Row-major grid of depth samples in meters.
///
/// Used both for raw sensor output and for calibrated maps. Construction
/// rejects empty grids, so every `DepthMap` has at least one sample.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthMap {
    width: u32,
    height: u32,
    samples: Vec<f64>,
}

/// Linear depth straight from the sensor, before calibration.
pub type RawDepthMap = DepthMap;

impl DepthMap {
    pub fn new(width: u32, height: u32, samples: Vec<f64>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("depth map must not be empty ({}x{})", width, height));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| anyhow!("depth map dimensions overflow"))?;
        if samples.len() != expected {
            return Err(anyhow!(
                "depth map length mismatch: expected {}, got {}",
                expected,
                samples.len()
            ));
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Depth map with every sample set to `value`.
    pub fn filled(width: u32, height: u32, value: f64) -> Result<Self> {
        Self::new(width, height, vec![value; width as usize * height as usize])
    }

    pub fn from_f32(width: u32, height: u32, samples: &[f32]) -> Result<Self> {
        Self::new(width, height, samples.iter().map(|&v| v as f64).collect())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Sample at column `x`, row `y`. Panics when out of bounds.
    pub fn get(&self, x: u32, y: u32) -> f64 {
        self.samples[y as usize * self.width as usize + x as usize]
    }

    /// Copy out the samples inside `rect`.
    pub fn crop(&self, rect: PixelRect) -> Result<DepthMap> {
        if rect.is_empty() {
            return Err(anyhow!("depth crop is empty"));
        }
        if rect.x + rect.width > self.width || rect.y + rect.height > self.height {
            return Err(anyhow!(
                "depth crop {}x{}+{}+{} exceeds map {}x{}",
                rect.width,
                rect.height,
                rect.x,
                rect.y,
                self.width,
                self.height
            ));
        }
        let mut samples = Vec::with_capacity(rect.width as usize * rect.height as usize);
        for y in rect.y..rect.y + rect.height {
            let start = y as usize * self.width as usize + rect.x as usize;
            samples.extend_from_slice(&self.samples[start..start + rect.width as usize]);
        }
        DepthMap::new(rect.width, rect.height, samples)
    }

    /// Grayscale rendering, near = bright, spread over the finite sample range.
    pub fn visualize(&self) -> GrayImage {
        let (min, max) = self
            .samples
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold((f64::MAX, f64::MIN), |(min, max), v| (min.min(v), max.max(v)));
        let span = if max > min { max - min } else { 1.0 };
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let v = self.get(x, y);
            if !v.is_finite() {
                return Luma([0]);
            }
            let t = ((max - v) / span).clamp(0.0, 1.0);
            Luma([(t * 255.0).round() as u8])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_mismatched_maps() {
        assert!(DepthMap::new(0, 4, vec![]).is_err());
        assert!(DepthMap::new(2, 2, vec![1.0; 3]).is_err());
        assert!(DepthMap::new(2, 2, vec![1.0; 4]).is_ok());
    }

    #[test]
    fn crop_copies_row_major_window() -> Result<()> {
        let map = DepthMap::new(3, 3, (0..9).map(|v| v as f64).collect())?;
        let crop = map.crop(PixelRect {
            x: 1,
            y: 1,
            width: 2,
            height: 2,
        })?;
        assert_eq!(crop.samples(), &[4.0, 5.0, 7.0, 8.0]);
        assert!(map
            .crop(PixelRect {
                x: 2,
                y: 0,
                width: 2,
                height: 1
            })
            .is_err());
        Ok(())
    }

    #[test]
    fn visualization_maps_nearest_to_white() -> Result<()> {
        let map = DepthMap::new(2, 1, vec![0.3, 0.5])?;
        let img = map.visualize();
        assert_eq!(img.get_pixel(0, 0).0, [255]);
        assert_eq!(img.get_pixel(1, 0).0, [0]);
        Ok(())
    }
}
