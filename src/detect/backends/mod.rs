pub mod fixed;
pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use fixed::{FixedRegionDetector, FullFrameDetector};
pub use stub::{StubClassifier, StubSegmenter};

#[cfg(feature = "backend-tract")]
pub use tract::{TractClassifier, TractSegmenter};
