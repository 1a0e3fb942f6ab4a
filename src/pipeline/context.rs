use std::sync::Arc;

use anyhow::Result;

use crate::config::EstimatorConfig;
use crate::detect::{
    FullFrameDetector, RegionClassifier, RegionDetector, RegionSegmenter, StubClassifier,
    StubSegmenter,
};
use crate::food::CalorieRegressor;

/// Model handles and regression table for one process.
///
/// Built once at startup and shared by every run through `Arc`.
pub struct EstimationContext {
    pub detector: Arc<dyn RegionDetector>,
    pub classifier: Arc<dyn RegionClassifier>,
    pub segmenter: Arc<dyn RegionSegmenter>,
    pub regressor: CalorieRegressor,
}

impl EstimationContext {
    pub fn new(
        detector: Arc<dyn RegionDetector>,
        classifier: Arc<dyn RegionClassifier>,
        segmenter: Arc<dyn RegionSegmenter>,
        regressor: CalorieRegressor,
    ) -> Self {
        Self {
            detector,
            classifier,
            segmenter,
            regressor,
        }
    }

    /// Full-frame detector with deterministic stub models.
    pub fn stub(regressor: CalorieRegressor) -> Self {
        Self::new(
            Arc::new(FullFrameDetector::new()),
            Arc::new(StubClassifier::new()),
            Arc::new(StubSegmenter::new()),
            regressor,
        )
    }

    /// Build handles from configuration.
    ///
    /// ONNX models are used when the `backend-tract` feature is enabled and a
    /// model path is configured; otherwise the stub backends are used.
    pub fn from_config(config: &EstimatorConfig) -> Result<Self> {
        let classifier = build_classifier(config)?;
        let segmenter = build_segmenter(config)?;
        log::info!(
            "estimation context: detector=full_frame classifier={} segmenter={}",
            classifier.name(),
            segmenter.name()
        );
        Ok(Self::new(
            Arc::new(FullFrameDetector::new()),
            classifier,
            segmenter,
            config.regressor(),
        ))
    }

    /// Replace the region detector.
    pub fn with_detector(mut self, detector: Arc<dyn RegionDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn warm_up(&self) -> Result<()> {
        self.classifier.warm_up()?;
        self.segmenter.warm_up()
    }
}

#[cfg(feature = "backend-tract")]
fn build_classifier(config: &EstimatorConfig) -> Result<Arc<dyn RegionClassifier>> {
    match &config.models.classifier_path {
        Some(path) => Ok(Arc::new(crate::detect::TractClassifier::new(
            path,
            config.models.classifier_input,
        )?)),
        None => Ok(Arc::new(StubClassifier::new())),
    }
}

#[cfg(not(feature = "backend-tract"))]
fn build_classifier(config: &EstimatorConfig) -> Result<Arc<dyn RegionClassifier>> {
    if config.models.classifier_path.is_some() {
        log::warn!("classifier model configured but backend-tract is disabled; using stub");
    }
    Ok(Arc::new(StubClassifier::new()))
}

#[cfg(feature = "backend-tract")]
fn build_segmenter(config: &EstimatorConfig) -> Result<Arc<dyn RegionSegmenter>> {
    match &config.models.segmenter_path {
        Some(path) => Ok(Arc::new(
            crate::detect::TractSegmenter::new(path, config.models.segmenter_input)?
                .with_threshold(config.models.mask_threshold),
        )),
        None => Ok(Arc::new(StubSegmenter::new())),
    }
}

#[cfg(not(feature = "backend-tract"))]
fn build_segmenter(config: &EstimatorConfig) -> Result<Arc<dyn RegionSegmenter>> {
    if config.models.segmenter_path.is_some() {
        log::warn!("segmenter model configured but backend-tract is disabled; using stub");
    }
    Ok(Arc::new(StubSegmenter::new()))
}
