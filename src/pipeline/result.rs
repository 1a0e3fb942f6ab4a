use std::fmt;
use std::sync::Arc;

use image::{GrayImage, RgbImage, RgbaImage};
use serde::Serialize;

use crate::depth::{CalibratedDepth, DepthMap};
use crate::food::{ClassificationLabel, FoodClass};
use crate::geometry::{NormalizedRect, PixelRect};
use crate::mask::SegmentationMask;

const CM2_PER_M2: f64 = 1e4;
const CM3_PER_M3: f64 = 1e6;

/// Why a run was aborted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Classification,
    Segmentation,
    /// Depth crop, volume integration or calorie mapping failed.
    Estimation,
    /// Nothing to report, or the regions could not be proposed.
    Empty,
}

impl FailureKind {
    /// User-facing message for this kind of failure.
    pub fn message(self) -> &'static str {
        match self {
            FailureKind::Classification => "Failed to classify images.",
            FailureKind::Segmentation => "Failed to segment images.",
            FailureKind::Estimation => "Failed to estimate calorie.",
            FailureKind::Empty => "Failed to process.",
        }
    }
}

/// Terminal failure of one estimation run.
#[derive(Clone, Debug, PartialEq)]
pub struct EstimationError {
    pub kind: FailureKind,
    pub message: String,
    /// Underlying cause, when one is known.
    pub detail: Option<String>,
}

impl EstimationError {
    pub fn new(kind: FailureKind) -> Self {
        Self {
            kind,
            message: kind.message().to_string(),
            detail: None,
        }
    }

    pub fn with_detail(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..Self::new(kind)
        }
    }

    /// Wrap an `anyhow` cause, keeping its full context chain as the detail.
    pub fn from_cause(kind: FailureKind, cause: &anyhow::Error) -> Self {
        Self::with_detail(kind, format!("{cause:#}"))
    }
}

impl fmt::Display for EstimationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({})", self.message, detail),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for EstimationError {}

/// Depth-derived data kept for one region on the depth path.
#[derive(Clone, Debug)]
pub struct RegionDepth {
    /// Region rectangle in depth map pixels.
    pub rect: PixelRect,
    /// Calibrated samples inside `rect`.
    pub crop: DepthMap,
    /// Segmentation mask resampled to the crop size.
    pub mask: SegmentationMask,
    /// Grayscale rendering of `crop`.
    pub visualization: GrayImage,
    pub calibrated: Arc<CalibratedDepth>,
}

/// Everything known about one food region after a run.
#[derive(Clone, Debug)]
pub struct RegionEstimate {
    pub label: ClassificationLabel,
    pub rect: NormalizedRect,
    /// Surface area in m².
    pub area: Option<f64>,
    /// Volume in m³.
    pub volume: Option<f64>,
    pub calories: Option<f64>,
    pub cropped_image: RgbImage,
    /// Crop with background pixels cleared to transparent black.
    pub masked_image: RgbaImage,
    pub depth: Option<RegionDepth>,
}

impl RegionEstimate {
    pub fn depth_image(&self) -> Option<&GrayImage> {
        self.depth.as_ref().map(|depth| &depth.visualization)
    }

    pub fn calibrated_depth(&self) -> Option<&Arc<CalibratedDepth>> {
        self.depth.as_ref().map(|depth| &depth.calibrated)
    }

    pub fn summary(&self) -> RegionSummary {
        RegionSummary {
            class: self.label.class,
            name: self.label.name.clone(),
            confidence: self.label.confidence,
            rect: self.rect,
            area_cm2: self.area.map(|a| a * CM2_PER_M2),
            volume_cm3: self.volume.map(|v| v * CM3_PER_M3),
            calories: self.calories,
        }
    }
}

impl fmt::Display for RegionEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.summary().fmt(f)
    }
}

/// Serializable view of a [`RegionEstimate`] in display units.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegionSummary {
    pub class: FoodClass,
    pub name: String,
    pub confidence: f32,
    pub rect: NormalizedRect,
    pub area_cm2: Option<f64>,
    pub volume_cm3: Option<f64>,
    pub calories: Option<f64>,
}

impl fmt::Display for RegionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.calories, self.area_cm2, self.volume_cm3) {
            (Some(calories), Some(area), Some(volume)) => write!(
                f,
                "{}: {:.1} kcal (S = {:.1} cm², V = {:.1} cm³)",
                self.name, calories, area, volume
            ),
            _ => f.write_str(&self.name),
        }
    }
}

/// Ordered regions produced by one run. Never empty.
#[derive(Clone, Debug)]
pub struct EstimationRun {
    regions: Vec<RegionEstimate>,
}

impl EstimationRun {
    pub fn new(regions: Vec<RegionEstimate>) -> Result<Self, EstimationError> {
        if regions.is_empty() {
            return Err(EstimationError::with_detail(
                FailureKind::Empty,
                "no regions were estimated",
            ));
        }
        Ok(Self { regions })
    }

    pub fn regions(&self) -> &[RegionEstimate] {
        &self.regions
    }

    pub fn into_regions(self) -> Vec<RegionEstimate> {
        self.regions
    }

    pub fn summaries(&self) -> Vec<RegionSummary> {
        self.regions.iter().map(RegionEstimate::summary).collect()
    }

    /// Sum of per-region calories, when every region has one.
    pub fn total_calories(&self) -> Option<f64> {
        self.regions.iter().map(|r| r.calories).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::food::ClassPrediction;

    fn estimate(calories: Option<f64>) -> RegionEstimate {
        let label = ClassificationLabel::from_prediction(ClassPrediction {
            class_index: 0,
            confidence: 0.9,
        })
        .unwrap();
        RegionEstimate {
            label,
            rect: NormalizedRect::full_frame(),
            area: calories.map(|_| 1.2e-3),
            volume: calories.map(|_| 2.0e-5),
            calories,
            cropped_image: RgbImage::new(1, 1),
            masked_image: RgbaImage::new(1, 1),
            depth: None,
        }
    }

    #[test]
    fn empty_run_is_a_failure() {
        let err = EstimationRun::new(Vec::new()).unwrap_err();
        assert_eq!(err.kind, FailureKind::Empty);
        assert_eq!(err.message, "Failed to process.");
    }

    #[test]
    fn summary_renders_display_units() {
        let text = estimate(Some(63.1)).to_string();
        assert_eq!(text, "Sweet and sour pork: 63.1 kcal (S = 12.0 cm², V = 20.0 cm³)");
        assert_eq!(estimate(None).to_string(), "Sweet and sour pork");
    }

    #[test]
    fn total_requires_every_region() {
        let run = EstimationRun::new(vec![estimate(Some(10.0)), estimate(Some(5.5))]).unwrap();
        assert_eq!(run.total_calories(), Some(15.5));
        let run = EstimationRun::new(vec![estimate(Some(10.0)), estimate(None)]).unwrap();
        assert_eq!(run.total_calories(), None);
    }

    #[test]
    fn error_display_includes_detail() {
        let err = EstimationError::with_detail(FailureKind::Segmentation, "model missing");
        assert_eq!(err.to_string(), "Failed to segment images. (model missing)");
    }
}
