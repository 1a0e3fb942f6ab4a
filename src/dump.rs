//! Debug dumps of captured frames and per-region results.
//!
//! Depth maps are written as text: a `width,height` header line followed by
//! one line of comma-separated samples with five decimals.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};

use crate::depth::{DepthMap, RawDepthMap};
use crate::frame::Frame;
use crate::pipeline::EstimationRun;

/// Render `depth` in the dump text format.
pub fn format_depth_map(depth: &DepthMap) -> String {
    let values: Vec<String> = depth.samples().iter().map(|v| format!("{:.5}", v)).collect();
    format!("{},{}\n{}", depth.width(), depth.height(), values.join(","))
}

/// Parse the dump text format.
pub fn parse_depth_map(text: &str) -> Result<RawDepthMap> {
    let (header, body) = text
        .split_once('\n')
        .ok_or_else(|| anyhow!("depth dump is missing its header line"))?;
    let (width, height) = header
        .trim()
        .split_once(',')
        .ok_or_else(|| anyhow!("depth dump header must be 'width,height'"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid depth dump width '{}'", width))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid depth dump height '{}'", height))?;

    let samples = body
        .trim()
        .split(',')
        .filter(|value| !value.trim().is_empty())
        .map(|value| {
            value
                .trim()
                .parse::<f64>()
                .map_err(|_| anyhow!("invalid depth sample '{}'", value))
        })
        .collect::<Result<Vec<_>>>()?;
    RawDepthMap::new(width, height, samples)
}

pub fn write_depth_map(path: &Path, depth: &DepthMap) -> Result<()> {
    fs::write(path, format_depth_map(depth))
        .with_context(|| format!("failed to write depth dump {}", path.display()))
}

pub fn read_depth_map(path: &Path) -> Result<RawDepthMap> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read depth dump {}", path.display()))?;
    parse_depth_map(&text).with_context(|| format!("invalid depth dump {}", path.display()))
}

/// Writes frames and region images into one directory.
#[derive(Clone, Debug)]
pub struct DumpSink {
    dir: PathBuf,
}

impl DumpSink {
    /// Use `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create dump directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Millisecond timestamp used to group the files of one capture.
    pub fn stamp() -> Result<String> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| anyhow!("system clock is before the Unix epoch"))?;
        Ok(elapsed.as_millis().to_string())
    }

    /// `{stamp}-color.png` and, when present, `{stamp}-depth.txt`.
    pub fn write_frame(&self, stamp: &str, frame: &Frame) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        let color_path = self.dir.join(format!("{stamp}-color.png"));
        frame
            .color
            .save(&color_path)
            .with_context(|| format!("failed to write {}", color_path.display()))?;
        written.push(color_path);

        if let Some(depth) = &frame.depth {
            let depth_path = self.dir.join(format!("{stamp}-depth.txt"));
            write_depth_map(&depth_path, depth)?;
            written.push(depth_path);
        }
        log::debug!("dumped frame {} to {}", stamp, self.dir.display());
        Ok(written)
    }

    /// `{stamp}-region{i}-masked.png` and, on the depth path, `{stamp}-region{i}-depth.png`.
    pub fn write_run(&self, stamp: &str, run: &EstimationRun) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (index, region) in run.regions().iter().enumerate() {
            let masked_path = self.dir.join(format!("{stamp}-region{index}-masked.png"));
            region
                .masked_image
                .save(&masked_path)
                .with_context(|| format!("failed to write {}", masked_path.display()))?;
            written.push(masked_path);

            if let Some(depth_image) = region.depth_image() {
                let depth_path = self.dir.join(format!("{stamp}-region{index}-depth.png"));
                depth_image
                    .save(&depth_path)
                    .with_context(|| format!("failed to write {}", depth_path.display()))?;
                written.push(depth_path);
            }
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_header_and_five_decimals() -> Result<()> {
        let depth = DepthMap::new(2, 1, vec![0.25, 1.0 / 3.0])?;
        assert_eq!(format_depth_map(&depth), "2,1\n0.25000,0.33333");
        Ok(())
    }

    #[test]
    fn rejects_sample_count_mismatch() {
        assert!(parse_depth_map("2,2\n0.1,0.2,0.3").is_err());
        assert!(parse_depth_map("no header").is_err());
        assert!(parse_depth_map("2,1\n0.1,abc").is_err());
    }

    #[test]
    fn parses_trailing_newline() -> Result<()> {
        let depth = parse_depth_map("1,2\n0.5,0.75\n")?;
        assert_eq!(depth.samples(), &[0.5, 0.75]);
        Ok(())
    }
}
