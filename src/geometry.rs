//! Frame geometry: normalized regions and their pixel-space counterparts.
//!
//! Regions are carried in normalized coordinates and denormalized separately
//! against the color image size and the depth map size, which may differ.

use serde::Serialize;

/// Pixel dimensions of an image or depth map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Rectangle in [0, 1] coordinates relative to the full frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn full_frame() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    /// Normalize a pixel rectangle against `bounds`, clamping it into the unit square.
    pub fn from_pixels_clamped(rect: PixelRect, bounds: Size) -> Self {
        let x = (rect.x as f64 / bounds.width as f64).clamp(0.0, 1.0);
        let y = (rect.y as f64 / bounds.height as f64).clamp(0.0, 1.0);
        let width = rect.width as f64 / bounds.width as f64;
        let height = rect.height as f64 / bounds.height as f64;
        Self {
            x,
            y,
            width: if x + width <= 1.0 { width } else { 1.0 - x },
            height: if y + height <= 1.0 { height } else { 1.0 - y },
        }
    }

    /// Scale to pixel coordinates of `bounds`.
    ///
    /// Start and end edges are truncated independently and the result is
    /// clipped to the bounds, so the returned rectangle may be empty.
    pub fn denormalize(&self, bounds: Size) -> PixelRect {
        let w = bounds.width as f64;
        let h = bounds.height as f64;
        let x0 = truncate_to_bound(self.x * w, bounds.width);
        let y0 = truncate_to_bound(self.y * h, bounds.height);
        let x1 = truncate_to_bound((self.x + self.width) * w, bounds.width);
        let y1 = truncate_to_bound((self.y + self.height) * h, bounds.height);
        PixelRect {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }
}

fn truncate_to_bound(value: f64, bound: u32) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        (value as u64).min(bound as u64) as u32
    }
}

/// Integer rectangle in pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_frame_denormalizes_to_bounds() {
        let rect = NormalizedRect::full_frame().denormalize(Size::new(640, 480));
        assert_eq!(
            rect,
            PixelRect {
                x: 0,
                y: 0,
                width: 640,
                height: 480
            }
        );
    }

    #[test]
    fn same_region_maps_to_different_reference_sizes() {
        let region = NormalizedRect::new(0.25, 0.5, 0.5, 0.25);
        let image = region.denormalize(Size::new(640, 480));
        let depth = region.denormalize(Size::new(160, 120));
        assert_eq!((image.x, image.y, image.width, image.height), (160, 240, 320, 120));
        assert_eq!((depth.x, depth.y, depth.width, depth.height), (40, 60, 80, 30));
    }

    #[test]
    fn out_of_bounds_region_is_clipped() {
        let rect = NormalizedRect::new(0.9, -0.5, 0.5, 1.0).denormalize(Size::new(10, 10));
        assert_eq!(rect.x, 9);
        assert_eq!(rect.width, 1);
        assert_eq!(rect.y, 0);
        assert_eq!(rect.height, 5);
    }

    #[test]
    fn clamped_normalization_stays_inside_unit_square() {
        let rect = NormalizedRect::from_pixels_clamped(
            PixelRect {
                x: 80,
                y: 0,
                width: 40,
                height: 50,
            },
            Size::new(100, 100),
        );
        assert!((rect.x - 0.8).abs() < 1e-12);
        assert!((rect.width - 0.2).abs() < 1e-12);
        assert!((rect.height - 0.5).abs() < 1e-12);
    }
}
