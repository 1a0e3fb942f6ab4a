//! Perspective-corrected area and volume integration over a masked depth map.

use anyhow::{anyhow, Result};

use crate::depth::DepthMap;
use crate::mask::SegmentationMask;

/// Physical surface area (m²) and volume (m³) of one region.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VolumeEstimate {
    pub area: f64,
    pub volume: f64,
}

/// Integrates height above the base plane over the masked pixels.
#[derive(Clone, Copy, Debug)]
pub struct VolumeIntegrator {
    base_depth: f64,
    area_per_pixel: f64,
}

impl VolumeIntegrator {
    pub fn new(base_depth: f64, area_per_pixel: f64) -> Self {
        Self {
            base_depth,
            area_per_pixel,
        }
    }

    /// Sum area and volume over pixels where `mask` is set.
    ///
    /// A pixel at depth `d` covers `area_per_pixel × (d / base)²` of real
    /// surface (pinhole projection). Pixels behind the base plane contribute
    /// negative volume; they are not clamped.
    pub fn integrate(&self, depth: &DepthMap, mask: &SegmentationMask) -> Result<VolumeEstimate> {
        if depth.size() != mask.size() {
            return Err(anyhow!(
                "mask {}x{} does not match depth crop {}x{}",
                mask.width(),
                mask.height(),
                depth.width(),
                depth.height()
            ));
        }

        let mut estimate = VolumeEstimate::default();
        for (&d, _) in depth
            .samples()
            .iter()
            .zip(mask.iter())
            .filter(|(_, foreground)| *foreground)
        {
            let expansion_ratio = (self.base_depth / d).powi(2);
            let pixel_area = self.area_per_pixel / expansion_ratio;
            estimate.area += pixel_area;
            estimate.volume += (self.base_depth - d) * pixel_area;
        }
        Ok(estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_pixel_on_base_plane_has_no_volume() -> Result<()> {
        let depth = DepthMap::new(2, 1, vec![0.5, 0.3])?;
        let mask = SegmentationMask::from_bools(2, 1, &[true, false])?;
        let estimate = VolumeIntegrator::new(0.5, 1e-6).integrate(&depth, &mask)?;
        assert_eq!(estimate.volume, 0.0);
        assert_eq!(estimate.area, 1e-6);
        Ok(())
    }

    #[test]
    fn empty_mask_contributes_nothing() -> Result<()> {
        let depth = DepthMap::filled(3, 3, 0.2)?;
        let mask = SegmentationMask::new(3, 3);
        let estimate = VolumeIntegrator::new(0.5, 1e-6).integrate(&depth, &mask)?;
        assert_eq!(estimate, VolumeEstimate::default());
        Ok(())
    }

    #[test]
    fn nearer_pixels_shrink_area_and_add_height() -> Result<()> {
        let depth = DepthMap::filled(2, 2, 0.4)?;
        let mask = SegmentationMask::from_fn(2, 2, |_, _| true);
        let estimate = VolumeIntegrator::new(0.5, 1e-4).integrate(&depth, &mask)?;
        let pixel_area = 1e-4 * (0.4f64 / 0.5).powi(2);
        assert!((estimate.area - 4.0 * pixel_area).abs() < 1e-15);
        assert!((estimate.volume - 4.0 * 0.1 * pixel_area).abs() < 1e-15);
        Ok(())
    }

    #[test]
    fn pixels_behind_base_plane_subtract_volume() -> Result<()> {
        let depth = DepthMap::new(2, 1, vec![0.4, 0.6])?;
        let mask = SegmentationMask::from_fn(2, 1, |_, _| true);
        let estimate = VolumeIntegrator::new(0.5, 1e-4).integrate(&depth, &mask)?;
        let above = 0.1 * 1e-4 * (0.4f64 / 0.5).powi(2);
        let below = -0.1 * 1e-4 * (0.6f64 / 0.5).powi(2);
        assert!((estimate.volume - (above + below)).abs() < 1e-15);
        assert!(estimate.volume < 0.0);
        Ok(())
    }

    #[test]
    fn mismatched_mask_is_rejected() -> Result<()> {
        let depth = DepthMap::filled(2, 2, 0.4)?;
        let mask = SegmentationMask::new(3, 2);
        assert!(VolumeIntegrator::new(0.5, 1e-4)
            .integrate(&depth, &mask)
            .is_err());
        Ok(())
    }
}
