use anyhow::Result;
use image::RgbImage;

use crate::detect::backend::RegionDetector;
use crate::detect::result::DetectionRegion;
use crate::geometry::NormalizedRect;

/// Detector that always proposes the whole frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct FullFrameDetector;

impl FullFrameDetector {
    pub fn new() -> Self {
        Self
    }
}

impl RegionDetector for FullFrameDetector {
    fn name(&self) -> &'static str {
        "full_frame"
    }

    fn detect(&self, _image: &RgbImage) -> Result<Vec<DetectionRegion>> {
        Ok(vec![DetectionRegion::full_frame()])
    }
}

/// Detector returning a caller-supplied list of regions (e.g. from the CLI).
#[derive(Clone, Debug, Default)]
pub struct FixedRegionDetector {
    regions: Vec<NormalizedRect>,
}

impl FixedRegionDetector {
    pub fn new(regions: Vec<NormalizedRect>) -> Self {
        Self { regions }
    }
}

impl RegionDetector for FixedRegionDetector {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn detect(&self, _image: &RgbImage) -> Result<Vec<DetectionRegion>> {
        Ok(self
            .regions
            .iter()
            .map(|rect| DetectionRegion::new(*rect, 1.0))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_frame_detector_yields_one_region() -> Result<()> {
        let image = RgbImage::new(4, 4);
        let regions = FullFrameDetector::new().detect(&image)?;
        assert_eq!(regions, vec![DetectionRegion::full_frame()]);
        assert_eq!(regions[0].confidence, 1.0);
        Ok(())
    }

    #[test]
    fn fixed_detector_may_yield_nothing() -> Result<()> {
        let image = RgbImage::new(4, 4);
        assert!(FixedRegionDetector::default().detect(&image)?.is_empty());
        Ok(())
    }
}
