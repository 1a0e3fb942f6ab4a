//! Depth maps and depth calibration.
//!
//! Raw sensor depth is corrected with a fitted affine transform, far-plane
//! outliers are clamped to a robust ceiling, and the base plane distance and
//! physical frame extents are derived from the camera field of view.

mod calibrate;
mod map;

pub use calibrate::{
    BaseDepthWeighting, CalibratedDepth, CalibrationParams, DepthCalibrator,
    DEFAULT_BASE_DEPTH_CORRECTION, DEFAULT_DEPTH_INTERCEPT, DEFAULT_DEPTH_SLOPE,
    DEFAULT_IGNORE_FRACTION,
};
pub use map::{DepthMap, RawDepthMap};
