//! Depth-calibrated food volume and calorie estimation.
//!
//! This crate turns one color frame plus a linear depth map from a
//! depth-sensing camera into per-item surface area, volume and calories.
//!
//! # Pipeline
//!
//! 1. **Calibrate**: raw sensor depth is corrected with a fitted affine
//!    transform, far outliers are clamped to a robust ceiling, and the base
//!    plane distance and physical frame size follow from the field of view.
//! 2. **Detect**: food regions are proposed in normalized coordinates.
//! 3. **Classify** and **Segment** each cropped region.
//! 4. **Integrate** height above the base plane over the masked pixels,
//!    with perspective correction, and map volume to calories per class.
//!
//! The first failure on any region aborts the run. Without a depth map the
//! pipeline still classifies and segments but reports no measurements.
//!
//! # Module Structure
//!
//! - `depth`: depth maps and calibration
//! - `detect`: detector, classifier and segmenter backends
//! - `pipeline`: stage sequencing, results, the single-flight runner
//! - `frame`, `ingest`: captured frames, the latest-frame slot, capture sources
//! - `dump`, `pointcloud`: debug dumps and LAS export

pub mod config;
pub mod depth;
pub mod detect;
pub mod dump;
pub mod food;
pub mod frame;
pub mod geometry;
pub mod ingest;
pub mod mask;
pub mod pipeline;
pub mod pointcloud;
pub mod ui;
pub mod volume;

pub use config::EstimatorConfig;
pub use depth::{
    BaseDepthWeighting, CalibratedDepth, CalibrationParams, DepthCalibrator, DepthMap,
    RawDepthMap,
};
pub use detect::{
    DetectionRegion, FixedRegionDetector, FullFrameDetector, RegionClassifier, RegionDetector,
    RegionSegmenter, StubClassifier, StubSegmenter,
};
#[cfg(feature = "backend-tract")]
pub use detect::{TractClassifier, TractSegmenter};
pub use food::{CalorieRegressor, ClassPrediction, ClassificationLabel, Coefficients, FoodClass};
pub use frame::{Frame, LatestFrame};
pub use geometry::{NormalizedRect, PixelRect, Size};
pub use ingest::{CaptureConfig, CaptureFeed, CaptureSource};
pub use mask::SegmentationMask;
pub use pipeline::{
    EstimationContext, EstimationError, EstimationPipeline, EstimationRun, FailureKind,
    NoProgress, PipelineRunner, ProgressObserver, RegionEstimate, RegionSummary, RunHandle,
};
pub use pointcloud::PointCloud;
pub use volume::{VolumeEstimate, VolumeIntegrator};
