use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use super::map::{DepthMap, RawDepthMap};

/// Fitted affine slope for the reference dual-camera depth sensor.
pub const DEFAULT_DEPTH_SLOPE: f64 = 1.063;
/// Fitted affine intercept (meters) for the reference sensor.
pub const DEFAULT_DEPTH_INTERCEPT: f64 = 3.243e-3;
/// Fraction of the farthest samples treated as background noise.
pub const DEFAULT_IGNORE_FRACTION: f64 = 0.2;
/// Empirical correction applied to the edge-midpoint base depth estimate.
pub const DEFAULT_BASE_DEPTH_CORRECTION: f64 = 1.052631579;

/// How the four edge-midpoint depths are combined into the base depth.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseDepthWeighting {
    /// Cosine-weighted mean: `Σ cos·d / Σ cos`. Equal edges yield `d × correction`.
    #[default]
    WeightedMean,
    /// Slant ranges projected onto the optical axis, then averaged: `Σ cos·d / 4`.
    Projected,
}

/// Device-specific calibration constants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationParams {
    pub slope: f64,
    pub intercept: f64,
    pub ignore_fraction: f64,
    pub base_depth_correction: f64,
    pub weighting: BaseDepthWeighting,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            slope: DEFAULT_DEPTH_SLOPE,
            intercept: DEFAULT_DEPTH_INTERCEPT,
            ignore_fraction: DEFAULT_IGNORE_FRACTION,
            base_depth_correction: DEFAULT_BASE_DEPTH_CORRECTION,
            weighting: BaseDepthWeighting::default(),
        }
    }
}

impl CalibrationParams {
    /// Affine sensor correction `slope·d + intercept`.
    pub fn apply(&self, depth: f64) -> f64 {
        self.slope * depth + self.intercept
    }
}

/// Calibrated depth plus the base-plane geometry derived from it.
///
/// Immutable once built; shared between region estimates through `Arc`.
#[derive(Clone, Debug)]
pub struct CalibratedDepth {
    depth: DepthMap,
    ceiling: f64,
    base_depth: f64,
    physical_width: f64,
    physical_height: f64,
}

impl CalibratedDepth {
    pub fn depth(&self) -> &DepthMap {
        &self.depth
    }

    /// Calibrated far-plane ceiling every sample was clamped to.
    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    /// Distance to the supporting surface, meters.
    pub fn base_depth(&self) -> f64 {
        self.base_depth
    }

    /// Real-world width spanned by the frame at the base plane, meters.
    pub fn physical_width(&self) -> f64 {
        self.physical_width
    }

    /// Real-world height spanned by the frame at the base plane, meters.
    pub fn physical_height(&self) -> f64 {
        self.physical_height
    }

    /// Base-plane area covered by one depth pixel, m².
    pub fn area_per_pixel(&self) -> f64 {
        (self.physical_width * self.physical_height) / self.depth.len() as f64
    }
}

/// Turns raw sensor depth into a [`CalibratedDepth`] using the camera field of view.
#[derive(Clone, Debug)]
pub struct DepthCalibrator {
    params: CalibrationParams,
    y_fov_deg: f64,
}

impl DepthCalibrator {
    pub fn new(params: CalibrationParams, y_fov_deg: f64) -> Self {
        Self { params, y_fov_deg }
    }

    pub fn params(&self) -> &CalibrationParams {
        &self.params
    }

    pub fn y_fov_deg(&self) -> f64 {
        self.y_fov_deg
    }

    /// Raw sample at descending rank `floor(N × ignore_fraction)`.
    pub fn robust_ceiling(&self, raw: &RawDepthMap) -> f64 {
        let mut sorted = raw.samples().to_vec();
        let rank = ((sorted.len() as f64 * self.params.ignore_fraction).floor() as usize)
            .min(sorted.len() - 1);
        let (_, ceiling, _) = sorted.select_nth_unstable_by(rank, |a, b| b.total_cmp(a));
        *ceiling
    }

    /// Calibrate `raw` and derive base depth and physical extents.
    ///
    /// Fails only for degenerate geometry (non-positive base depth or frame
    /// area), which callers must treat as a precondition failure before
    /// running the estimation pipeline.
    pub fn calibrate(&self, raw: &RawDepthMap) -> Result<CalibratedDepth> {
        let ceiling = self.params.apply(self.robust_ceiling(raw));
        let samples = raw
            .samples()
            .iter()
            .map(|&d| self.params.apply(d).min(ceiling))
            .collect();
        let depth = DepthMap::new(raw.width(), raw.height(), samples)?;

        let (w, h) = (depth.width(), depth.height());
        let x_fov_deg = w as f64 / h as f64 * self.y_fov_deg;
        if x_fov_deg >= 180.0 {
            return Err(anyhow!(
                "degenerate depth geometry: {}x{} depth map at {} deg vertical fov spans {} deg horizontally",
                w,
                h,
                self.y_fov_deg,
                x_fov_deg
            ));
        }
        let y_fov = self.y_fov_deg.to_radians();
        let x_fov = x_fov_deg.to_radians();
        let cos_y = (y_fov / 2.0).cos();
        let cos_x = (x_fov / 2.0).cos();

        let top = depth.get(w / 2, 0);
        let bottom = depth.get(w / 2, h - 1);
        let left = depth.get(0, h / 2);
        let right = depth.get(w - 1, h / 2);
        let weighted = (top + bottom) * cos_y + (left + right) * cos_x;
        let averaged = match self.params.weighting {
            BaseDepthWeighting::WeightedMean => weighted / (2.0 * cos_y + 2.0 * cos_x),
            BaseDepthWeighting::Projected => weighted / 4.0,
        };
        let base_depth = averaged * self.params.base_depth_correction;

        let physical_height = 2.0 * base_depth * (y_fov / 2.0).tan();
        let physical_width = 2.0 * base_depth * (x_fov / 2.0).tan();

        let calibrated = CalibratedDepth {
            depth,
            ceiling,
            base_depth,
            physical_width,
            physical_height,
        };
        let area_per_pixel = calibrated.area_per_pixel();
        if !(base_depth.is_finite() && base_depth > 0.0) {
            return Err(anyhow!(
                "degenerate depth geometry: base depth {} is not positive",
                base_depth
            ));
        }
        if !(area_per_pixel.is_finite() && area_per_pixel > 0.0) {
            return Err(anyhow!(
                "degenerate depth geometry: area per pixel {} is not positive",
                area_per_pixel
            ));
        }
        log::debug!(
            "depth calibrated: {}x{} ceiling={:.4} base={:.4}m extent={:.4}x{:.4}m",
            w,
            h,
            ceiling,
            base_depth,
            physical_width,
            physical_height
        );
        Ok(calibrated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_params() -> CalibrationParams {
        CalibrationParams {
            slope: 1.0,
            intercept: 0.0,
            ..CalibrationParams::default()
        }
    }

    #[test]
    fn every_sample_is_clamped_to_the_calibrated_ceiling() -> Result<()> {
        let samples: Vec<f64> = (0..64).map(|i| 0.3 + (i * 37 % 64) as f64 * 0.01).collect();
        let raw = DepthMap::new(8, 8, samples)?;
        let calibrator = DepthCalibrator::new(CalibrationParams::default(), 60.0);
        let result = calibrator.calibrate(&raw)?;
        assert!(result
            .depth()
            .samples()
            .iter()
            .all(|&v| v <= result.ceiling()));
        Ok(())
    }

    #[test]
    fn uniform_map_is_affine_transformed_without_clamping() -> Result<()> {
        let params = CalibrationParams::default();
        let raw = DepthMap::filled(6, 4, 0.4)?;
        let result = DepthCalibrator::new(params, 50.0).calibrate(&raw)?;
        let expected = params.slope * 0.4 + params.intercept;
        assert!(result.depth().samples().iter().all(|&v| v == expected));
        Ok(())
    }

    #[test]
    fn far_outliers_are_flattened_to_the_ceiling() -> Result<()> {
        let mut samples = vec![0.5; 9];
        samples[4] = 9.0;
        let raw = DepthMap::new(3, 3, samples)?;
        let result = DepthCalibrator::new(identity_params(), 60.0).calibrate(&raw)?;
        assert_eq!(result.ceiling(), 0.5);
        assert_eq!(result.depth().get(1, 1), 0.5);
        Ok(())
    }

    #[test]
    fn horizontal_fov_of_half_turn_or_more_is_rejected() -> Result<()> {
        let calibrator = DepthCalibrator::new(identity_params(), 60.0);
        for width in [3, 4, 5] {
            let raw = DepthMap::filled(width, 1, 0.5)?;
            let err = calibrator.calibrate(&raw).unwrap_err();
            assert!(err.to_string().contains("horizontally"), "{err}");
        }
        assert!(calibrator.calibrate(&DepthMap::filled(2, 1, 0.5)?).is_ok());
        Ok(())
    }

    #[test]
    fn equal_edge_midpoints_give_corrected_base_depth() -> Result<()> {
        let raw = DepthMap::filled(4, 4, 10.0)?;
        let result = DepthCalibrator::new(identity_params(), 60.0).calibrate(&raw)?;
        assert_eq!(result.ceiling(), 10.0);
        assert!((result.base_depth() - 10.0 * DEFAULT_BASE_DEPTH_CORRECTION).abs() < 1e-9);
        let height = 2.0 * result.base_depth() * 30f64.to_radians().tan();
        assert!((result.physical_height() - height).abs() < 1e-9);
        assert!((result.physical_height() - 12.1547).abs() < 1e-3);
        // square map: horizontal and vertical fov coincide
        assert!((result.physical_width() - result.physical_height()).abs() < 1e-9);
        let expected_area = result.physical_width() * result.physical_height() / 16.0;
        assert!((result.area_per_pixel() - expected_area).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn projected_weighting_scales_by_half_angle_cosine() -> Result<()> {
        let params = CalibrationParams {
            weighting: BaseDepthWeighting::Projected,
            ..identity_params()
        };
        let raw = DepthMap::filled(4, 4, 10.0)?;
        let result = DepthCalibrator::new(params, 60.0).calibrate(&raw)?;
        let expected = 10.0 * 30f64.to_radians().cos() * DEFAULT_BASE_DEPTH_CORRECTION;
        assert!((result.base_depth() - expected).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn wide_map_uses_aspect_scaled_horizontal_fov() -> Result<()> {
        let raw = DepthMap::filled(8, 4, 1.0)?;
        let result = DepthCalibrator::new(identity_params(), 40.0).calibrate(&raw)?;
        let width = 2.0 * result.base_depth() * 40f64.to_radians().tan();
        assert!((result.physical_width() - width).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn non_positive_base_depth_is_rejected() -> Result<()> {
        let raw = DepthMap::filled(4, 4, -1.0)?;
        assert!(DepthCalibrator::new(identity_params(), 60.0)
            .calibrate(&raw)
            .is_err());
        Ok(())
    }
}
