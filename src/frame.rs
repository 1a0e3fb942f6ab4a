//! Captured frames and the single-slot latest-frame cell.
//!
//! - `Frame`: one color image plus its optional raw depth map.
//! - `LatestFrame`: holds only the most recent frame. Writers replace the
//!   whole `Arc<Frame>`; readers take a snapshot. There is no backlog.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use image::RgbImage;

use crate::depth::RawDepthMap;
use crate::geometry::Size;

/// One capture tick.
#[derive(Clone, Debug)]
pub struct Frame {
    pub color: RgbImage,
    /// Absent when the device has no depth sensor.
    pub depth: Option<RawDepthMap>,
}

impl Frame {
    pub fn new(color: RgbImage, depth: Option<RawDepthMap>) -> Self {
        Self { color, depth }
    }

    pub fn image_size(&self) -> Size {
        Size::new(self.color.width(), self.color.height())
    }

    pub fn depth_size(&self) -> Option<Size> {
        self.depth.as_ref().map(RawDepthMap::size)
    }
}

/// Single-slot cell written by the capture feed and read by the trigger.
#[derive(Debug, Default)]
pub struct LatestFrame {
    slot: Mutex<Option<Arc<Frame>>>,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held frame.
    pub fn publish(&self, frame: Frame) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow!("latest frame lock poisoned"))?;
        *slot = Some(Arc::new(frame));
        Ok(())
    }

    /// Current frame, if any has been published yet.
    pub fn snapshot(&self) -> Result<Option<Arc<Frame>>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| anyhow!("latest frame lock poisoned"))?;
        Ok(slot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slot_yields_nothing() -> Result<()> {
        let latest = LatestFrame::new();
        assert!(latest.snapshot()?.is_none());
        Ok(())
    }

    #[test]
    fn publish_replaces_previous_frame() -> Result<()> {
        let latest = LatestFrame::new();
        latest.publish(Frame::new(RgbImage::new(2, 2), None))?;
        let first = latest.snapshot()?;
        latest.publish(Frame::new(
            RgbImage::new(4, 3),
            Some(RawDepthMap::filled(2, 2, 1.0)?),
        ))?;

        let second = latest.snapshot()?.ok_or_else(|| anyhow!("no frame"))?;
        assert_eq!(second.image_size(), Size::new(4, 3));
        assert_eq!(second.depth_size(), Some(Size::new(2, 2)));
        // Earlier snapshots stay intact.
        assert_eq!(first.map(|f| f.image_size()), Some(Size::new(2, 2)));
        Ok(())
    }
}
