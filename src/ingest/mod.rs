//! Frame capture sources.
//!
//! - Synthetic plate scene (`stub://` URLs, testing and demos)
//! - Local still image with an optional sibling `.depth` dump
//!
//! All sources produce [`Frame`] values. [`CaptureFeed`] drives a source on
//! its own thread and publishes into the [`LatestFrame`] slot.
//!
//! [`LatestFrame`]: crate::frame::LatestFrame

mod feed;
pub mod file;
pub mod synthetic;

use anyhow::Result;

use crate::config::CaptureSettings;
use crate::frame::Frame;

pub use feed::CaptureFeed;
pub use file::FileSource;
pub use synthetic::SyntheticSource;

/// Configuration for a capture source.
#[derive(Clone, Debug)]
pub struct CaptureConfig {
    /// `stub://name[?nodepth]` or a local image path.
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub depth_width: u32,
    pub depth_height: u32,
    pub target_fps: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            url: "stub://plate".to_string(),
            width: 640,
            height: 480,
            depth_width: 320,
            depth_height: 240,
            target_fps: 10,
        }
    }
}

impl From<&CaptureSettings> for CaptureConfig {
    fn from(settings: &CaptureSettings) -> Self {
        Self {
            url: settings.url.clone(),
            width: settings.width,
            height: settings.height,
            depth_width: settings.depth_width,
            depth_height: settings.depth_height,
            target_fps: settings.target_fps,
        }
    }
}

/// Capture source selected from the configured URL.
pub struct CaptureSource {
    backend: CaptureBackend,
}

enum CaptureBackend {
    Synthetic(SyntheticSource),
    File(FileSource),
}

impl CaptureSource {
    pub fn new(config: CaptureConfig) -> Result<Self> {
        let backend = if config.url.starts_with("stub://") {
            CaptureBackend::Synthetic(SyntheticSource::new(config))
        } else {
            CaptureBackend::File(FileSource::new(config)?)
        };
        Ok(Self { backend })
    }

    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CaptureBackend::Synthetic(source) => source.connect(),
            CaptureBackend::File(source) => source.connect(),
        }
    }

    /// Capture the next frame.
    pub fn next_frame(&mut self) -> Result<Frame> {
        match &mut self.backend {
            CaptureBackend::Synthetic(source) => source.next_frame(),
            CaptureBackend::File(source) => source.next_frame(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            CaptureBackend::Synthetic(source) => source.is_healthy(),
            CaptureBackend::File(source) => source.is_healthy(),
        }
    }

    pub fn stats(&self) -> CaptureStats {
        match &self.backend {
            CaptureBackend::Synthetic(source) => source.stats(),
            CaptureBackend::File(source) => source.stats(),
        }
    }
}

/// Statistics for a capture source.
#[derive(Clone, Debug)]
pub struct CaptureStats {
    pub frames_captured: u64,
    pub url: String,
}
