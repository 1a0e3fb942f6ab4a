mod backend;
mod backends;
mod result;

pub use backend::{RegionClassifier, RegionDetector, RegionSegmenter};
pub use backends::{FixedRegionDetector, FullFrameDetector, StubClassifier, StubSegmenter};
pub use result::DetectionRegion;

#[cfg(feature = "backend-tract")]
pub use backends::{TractClassifier, TractSegmenter};
