//! Detect, classify, segment and estimate over the regions of one frame.
//!
//! [`EstimationPipeline`] is the synchronous core. [`PipelineRunner`] wraps it
//! with a single-flight worker thread for capture loops.

mod context;
mod estimate;
mod progress;
mod result;
mod runner;

pub use context::EstimationContext;
pub use estimate::EstimationPipeline;
pub use progress::{NoProgress, ProgressObserver, Stage};
pub use result::{
    EstimationError, EstimationRun, FailureKind, RegionDepth, RegionEstimate, RegionSummary,
};
pub use runner::{PipelineRunner, RunEvent, RunHandle};
