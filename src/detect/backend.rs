use anyhow::Result;
use image::RgbImage;

use crate::detect::result::DetectionRegion;
use crate::food::ClassPrediction;
use crate::geometry::Size;
use crate::mask::SegmentationMask;

/// Proposes food regions in a full color frame.
pub trait RegionDetector: Send + Sync {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Zero or more regions in normalized frame coordinates.
    fn detect(&self, image: &RgbImage) -> Result<Vec<DetectionRegion>>;
}

/// Food classifier run on one cropped region.
///
/// # Contract
///
/// Implementations must be deterministic for identical input and must
/// resize the crop to their working resolution internally. Handles are
/// shared across worker threads, so inference takes `&self`.
pub trait RegionClassifier: Send + Sync {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Class index and confidence for the crop.
    fn predict(&self, image: &RgbImage) -> Result<ClassPrediction>;

    /// Optional warm-up hook.
    fn warm_up(&self) -> Result<()> {
        Ok(())
    }
}

/// Foreground segmentation run on one cropped region.
pub trait RegionSegmenter: Send + Sync {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Fixed resolution of the masks this backend returns.
    fn working_size(&self) -> Size;

    /// Binary mask at [`working_size`](Self::working_size).
    fn predict(&self, image: &RgbImage) -> Result<SegmentationMask>;

    /// Optional warm-up hook.
    fn warm_up(&self) -> Result<()> {
        Ok(())
    }
}
