use serde::Serialize;

use crate::geometry::NormalizedRect;

/// A proposed food region.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DetectionRegion {
    /// Bounding box (normalized 0..1 coordinates).
    pub rect: NormalizedRect,
    pub confidence: f32,
}

impl DetectionRegion {
    pub fn new(rect: NormalizedRect, confidence: f32) -> Self {
        Self { rect, confidence }
    }

    /// The whole frame with full confidence.
    pub fn full_frame() -> Self {
        Self::new(NormalizedRect::full_frame(), 1.0)
    }
}
