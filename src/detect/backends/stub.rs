use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;
use sha2::{Digest, Sha256};

use crate::detect::backend::{RegionClassifier, RegionSegmenter};
use crate::food::{ClassPrediction, FoodClass};
use crate::geometry::Size;
use crate::mask::SegmentationMask;

const STUB_CLASSIFIER_INPUT: u32 = 32;
const STUB_SEGMENTER_INPUT: u32 = 64;
/// Minimum RGB distance from the border color for a pixel to count as food.
const STUB_FOREGROUND_DISTANCE: f32 = 40.0;

/// Stub classifier for testing. Hashes the downsampled crop to pick a class.
pub struct StubClassifier {
    input_size: u32,
}

impl StubClassifier {
    pub fn new() -> Self {
        Self {
            input_size: STUB_CLASSIFIER_INPUT,
        }
    }
}

impl Default for StubClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionClassifier for StubClassifier {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn predict(&self, image: &RgbImage) -> Result<ClassPrediction> {
        if image.width() == 0 || image.height() == 0 {
            return Err(anyhow!("cannot classify an empty crop"));
        }
        let resized = imageops::resize(image, self.input_size, self.input_size, FilterType::Triangle);
        let digest: [u8; 32] = Sha256::digest(resized.as_raw()).into();

        Ok(ClassPrediction {
            class_index: digest[0] as usize % FoodClass::ALL.len(),
            confidence: 0.5 + digest[1] as f32 / 510.0,
        })
    }
}

/// Stub segmenter for testing.
///
/// Treats the mean border color as background and marks every pixel far
/// enough from it as foreground.
pub struct StubSegmenter {
    working_size: Size,
}

impl StubSegmenter {
    pub fn new() -> Self {
        Self {
            working_size: Size::new(STUB_SEGMENTER_INPUT, STUB_SEGMENTER_INPUT),
        }
    }

    pub fn with_working_size(mut self, size: Size) -> Self {
        self.working_size = size;
        self
    }
}

impl Default for StubSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionSegmenter for StubSegmenter {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn working_size(&self) -> Size {
        self.working_size
    }

    fn predict(&self, image: &RgbImage) -> Result<SegmentationMask> {
        if image.width() == 0 || image.height() == 0 {
            return Err(anyhow!("cannot segment an empty crop"));
        }
        let Size { width, height } = self.working_size;
        let resized = imageops::resize(image, width, height, FilterType::Triangle);
        let background = border_mean(&resized);

        Ok(SegmentationMask::from_fn(width, height, |x, y| {
            let [r, g, b] = resized.get_pixel(x, y).0;
            let dr = r as f32 - background[0];
            let dg = g as f32 - background[1];
            let db = b as f32 - background[2];
            (dr * dr + dg * dg + db * db).sqrt() > STUB_FOREGROUND_DISTANCE
        }))
    }
}

fn border_mean(image: &RgbImage) -> [f32; 3] {
    let (w, h) = image.dimensions();
    let mut sum = [0f32; 3];
    let mut count = 0f32;
    for (x, y, pixel) in image.enumerate_pixels() {
        if x == 0 || y == 0 || x + 1 == w || y + 1 == h {
            for (acc, &channel) in sum.iter_mut().zip(pixel.0.iter()) {
                *acc += channel as f32;
            }
            count += 1.0;
        }
    }
    sum.map(|v| v / count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn stub_classifier_is_deterministic() -> Result<()> {
        let classifier = StubClassifier::new();
        let image = RgbImage::from_fn(40, 30, |x, y| Rgb([x as u8, y as u8, 7]));

        let first = classifier.predict(&image)?;
        let second = classifier.predict(&image)?;
        assert_eq!(first, second);
        assert!(FoodClass::from_index(first.class_index).is_some());
        assert!((0.5..=1.0).contains(&first.confidence));
        Ok(())
    }

    #[test]
    fn stub_segmenter_separates_item_from_border() -> Result<()> {
        let segmenter = StubSegmenter::new().with_working_size(Size::new(16, 16));
        let image = RgbImage::from_fn(64, 64, |x, y| {
            if (16..48).contains(&x) && (16..48).contains(&y) {
                Rgb([150, 80, 20])
            } else {
                Rgb([220, 220, 220])
            }
        });

        let mask = segmenter.predict(&image)?;
        assert_eq!(mask.size(), Size::new(16, 16));
        assert!(mask.is_foreground(8, 8));
        assert!(!mask.is_foreground(0, 0));
        assert!(!mask.is_foreground(15, 15));
        Ok(())
    }
}
