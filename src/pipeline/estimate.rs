use std::sync::Arc;

use image::{imageops, RgbImage, RgbaImage};

use crate::depth::CalibratedDepth;
use crate::detect::DetectionRegion;
use crate::food::ClassificationLabel;
use crate::geometry::Size;
use crate::mask::SegmentationMask;
use crate::volume::VolumeIntegrator;

use super::context::EstimationContext;
use super::progress::{ProgressObserver, Stage, StageReporter};
use super::result::{EstimationError, EstimationRun, FailureKind, RegionDepth, RegionEstimate};

/// Region that has been cropped, classified and segmented.
struct Candidate {
    region: DetectionRegion,
    crop: RgbImage,
    label: ClassificationLabel,
    mask: SegmentationMask,
}

impl Candidate {
    fn masked_image(&self) -> RgbaImage {
        self.mask.apply_to(&self.crop)
    }
}

/// Sequences detect, classify, segment and estimate over every region.
///
/// The first failure on any region aborts the run; no partial result is
/// returned.
#[derive(Clone)]
pub struct EstimationPipeline {
    context: Arc<EstimationContext>,
}

impl EstimationPipeline {
    pub fn new(context: Arc<EstimationContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &EstimationContext {
        &self.context
    }

    /// Full run with area, volume and calories for every region.
    pub fn estimate_with_depth(
        &self,
        image: &RgbImage,
        depth: Arc<CalibratedDepth>,
        progress: &mut dyn ProgressObserver,
    ) -> Result<EstimationRun, EstimationError> {
        let mut stages = StageReporter::new(progress, 5);
        let candidates = self.recognize(image, &mut stages).map_err(log_failure)?;

        stages.enter(4, Stage::CalorieEstimation);
        let regions = candidates
            .into_iter()
            .map(|candidate| self.measure(candidate, &depth))
            .collect::<Result<Vec<_>, _>>()
            .map_err(log_failure)?;

        finish(regions)
    }

    /// Run without a depth map: regions carry labels and masked images only.
    pub fn estimate_without_depth(
        &self,
        image: &RgbImage,
        progress: &mut dyn ProgressObserver,
    ) -> Result<EstimationRun, EstimationError> {
        let mut stages = StageReporter::new(progress, 4);
        let candidates = self.recognize(image, &mut stages).map_err(log_failure)?;

        stages.enter(4, Stage::Finishing);
        let regions = candidates
            .into_iter()
            .map(|candidate| RegionEstimate {
                masked_image: candidate.masked_image(),
                label: candidate.label,
                rect: candidate.region.rect,
                area: None,
                volume: None,
                calories: None,
                cropped_image: candidate.crop,
                depth: None,
            })
            .collect();

        finish(regions)
    }

    /// Detection, classification and segmentation shared by both paths.
    fn recognize(
        &self,
        image: &RgbImage,
        stages: &mut StageReporter<'_>,
    ) -> Result<Vec<Candidate>, EstimationError> {
        let image_size = Size::new(image.width(), image.height());

        stages.enter(1, Stage::Detection);
        let regions = self
            .context
            .detector
            .detect(image)
            .map_err(|e| EstimationError::from_cause(FailureKind::Empty, &e))?;
        if regions.is_empty() {
            return Err(EstimationError::with_detail(
                FailureKind::Empty,
                "detector proposed no regions",
            ));
        }
        log::debug!(
            "{} proposed {} region(s) in {}x{} image",
            self.context.detector.name(),
            regions.len(),
            image_size.width,
            image_size.height
        );

        stages.enter(2, Stage::Classification);
        let mut classified = Vec::with_capacity(regions.len());
        for region in regions {
            let rect = region.rect.denormalize(image_size);
            if rect.is_empty() {
                return Err(EstimationError::with_detail(
                    FailureKind::Classification,
                    format!("region {:?} is empty in the color image", region.rect),
                ));
            }
            let crop = imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height).to_image();
            let prediction = self
                .context
                .classifier
                .predict(&crop)
                .map_err(|e| EstimationError::from_cause(FailureKind::Classification, &e))?;
            let label = ClassificationLabel::from_prediction(prediction).ok_or_else(|| {
                EstimationError::with_detail(
                    FailureKind::Classification,
                    format!("class index {} is not a known food", prediction.class_index),
                )
            })?;
            classified.push((region, crop, label));
        }

        stages.enter(3, Stage::Segmentation);
        classified
            .into_iter()
            .map(|(region, crop, label)| {
                let mask = self
                    .context
                    .segmenter
                    .predict(&crop)
                    .map_err(|e| EstimationError::from_cause(FailureKind::Segmentation, &e))?;
                Ok(Candidate {
                    region,
                    crop,
                    label,
                    mask,
                })
            })
            .collect()
    }

    /// Depth crop, volume integration and calorie regression for one region.
    fn measure(
        &self,
        candidate: Candidate,
        calibrated: &Arc<CalibratedDepth>,
    ) -> Result<RegionEstimate, EstimationError> {
        let estimation_failure = |e: anyhow::Error| EstimationError::from_cause(FailureKind::Estimation, &e);

        let depth_rect = candidate.region.rect.denormalize(calibrated.depth().size());
        let crop = calibrated.depth().crop(depth_rect).map_err(estimation_failure)?;
        let mask = candidate.mask.resized(crop.size());

        let integrator = VolumeIntegrator::new(calibrated.base_depth(), calibrated.area_per_pixel());
        let measured = integrator.integrate(&crop, &mask).map_err(estimation_failure)?;
        let calories = self
            .context
            .regressor
            .estimate(candidate.label.class, measured.volume)
            .map_err(estimation_failure)?;

        log::info!(
            "{}: area={:.6} m² volume={:.8} m³ calories={:.1}",
            candidate.label.class.key(),
            measured.area,
            measured.volume,
            calories
        );

        Ok(RegionEstimate {
            masked_image: candidate.masked_image(),
            label: candidate.label,
            rect: candidate.region.rect,
            area: Some(measured.area),
            volume: Some(measured.volume),
            calories: Some(calories),
            cropped_image: candidate.crop,
            depth: Some(RegionDepth {
                rect: depth_rect,
                visualization: crop.visualize(),
                crop,
                mask,
                calibrated: Arc::clone(calibrated),
            }),
        })
    }
}

fn finish(regions: Vec<RegionEstimate>) -> Result<EstimationRun, EstimationError> {
    EstimationRun::new(regions).map_err(log_failure)
}

fn log_failure(err: EstimationError) -> EstimationError {
    log::warn!("estimation aborted: {}", err);
    err
}
