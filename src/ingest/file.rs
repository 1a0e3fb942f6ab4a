//! Local still-image source.
//!
//! Loads one color image from disk and, when a sibling file with the
//! `.depth` extension exists, the matching depth dump. Frames written by
//! `DumpSink` (`{stamp}-color.png` next to `{stamp}-depth.txt`) are picked
//! up as well. Every call to `next_frame` returns the same capture.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::{CaptureConfig, CaptureStats};
use crate::dump::read_depth_map;
use crate::frame::Frame;

pub struct FileSource {
    path: PathBuf,
    url: String,
    frame: Option<Frame>,
    frames_captured: u64,
}

impl FileSource {
    pub fn new(config: CaptureConfig) -> Result<Self> {
        if !is_local_file_path(&config.url) {
            return Err(anyhow!(
                "file capture only supports local paths (no URL schemes): {}",
                config.url
            ));
        }
        Ok(Self {
            path: PathBuf::from(&config.url),
            url: config.url,
            frame: None,
            frames_captured: 0,
        })
    }

    /// Sibling depth dump path for `image_path`.
    pub fn depth_path_for(image_path: &Path) -> PathBuf {
        image_path.with_extension("depth")
    }

    /// Depth dump written by `DumpSink` next to a `{stamp}-color.*` image.
    pub fn dumped_depth_path_for(image_path: &Path) -> Option<PathBuf> {
        let stem = image_path.file_stem()?.to_str()?;
        let stamp = stem.strip_suffix("-color")?;
        Some(image_path.with_file_name(format!("{stamp}-depth.txt")))
    }

    fn find_depth(image_path: &Path) -> Option<PathBuf> {
        std::iter::once(Self::depth_path_for(image_path))
            .chain(Self::dumped_depth_path_for(image_path))
            .find(|path| path.is_file())
    }

    pub fn connect(&mut self) -> Result<()> {
        let color = image::open(&self.path)
            .with_context(|| format!("failed to open image {}", self.path.display()))?
            .to_rgb8();
        let depth = match Self::find_depth(&self.path) {
            Some(depth_path) => Some(read_depth_map(&depth_path)?),
            None => None,
        };
        log::info!(
            "CaptureSource: loaded {} ({}x{}, depth={})",
            self.path.display(),
            color.width(),
            color.height(),
            depth.is_some()
        );
        self.frame = Some(Frame::new(color, depth));
        Ok(())
    }

    pub fn next_frame(&mut self) -> Result<Frame> {
        if self.frame.is_none() {
            self.connect()?;
        }
        let frame = self
            .frame
            .clone()
            .ok_or_else(|| anyhow!("no frame loaded from {}", self.path.display()))?;
        self.frames_captured += 1;
        Ok(frame)
    }

    pub fn is_healthy(&self) -> bool {
        self.frame.is_some()
    }

    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_captured: self.frames_captured,
            url: self.url.clone(),
        }
    }
}

fn is_local_file_path(path: &str) -> bool {
    !path.trim().is_empty() && !path.contains("://")
}
