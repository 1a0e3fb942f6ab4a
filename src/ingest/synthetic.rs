//! Synthetic plate scene for `stub://` URLs.
//!
//! A flat plate at a fixed distance with one dome-shaped food item in the
//! middle. Color and depth are rendered from the same geometry, so the
//! pipeline sees a consistent region in both.

use anyhow::Result;
use image::{Rgb, RgbImage};

use super::{CaptureConfig, CaptureStats};
use crate::depth::RawDepthMap;
use crate::frame::Frame;

/// Distance from the camera to the plate, meters.
pub const PLATE_DISTANCE: f64 = 0.30;
/// Height of the dome apex above the plate, meters.
pub const DOME_HEIGHT: f64 = 0.03;
/// Dome radius as a fraction of the shorter frame side.
const DOME_RADIUS_FRACTION: f64 = 0.25;

const PLATE_COLOR: [u8; 3] = [225, 225, 220];
const FOOD_COLOR: [u8; 3] = [170, 95, 40];

pub struct SyntheticSource {
    config: CaptureConfig,
    with_depth: bool,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(config: CaptureConfig) -> Self {
        let with_depth = !has_query_flag(&config.url, "nodepth");
        Self {
            config,
            with_depth,
            frame_count: 0,
        }
    }

    pub fn connect(&mut self) -> Result<()> {
        log::info!(
            "CaptureSource: connected to {} (synthetic, depth={})",
            self.config.url,
            self.with_depth
        );
        Ok(())
    }

    pub fn next_frame(&mut self) -> Result<Frame> {
        self.frame_count += 1;
        let color = render_color(self.config.width, self.config.height);
        let depth = if self.with_depth {
            Some(render_depth(self.config.depth_width, self.config.depth_height)?)
        } else {
            None
        };
        Ok(Frame::new(color, depth))
    }

    pub fn is_healthy(&self) -> bool {
        true
    }

    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_captured: self.frame_count,
            url: self.config.url.clone(),
        }
    }
}

fn has_query_flag(url: &str, flag: &str) -> bool {
    url.split_once('?')
        .map(|(_, query)| query.split('&').any(|param| param == flag))
        .unwrap_or(false)
}

/// Dome profile at pixel `(x, y)` of a `width`×`height` grid: 0 outside, 1 at the apex.
fn dome_profile(x: u32, y: u32, width: u32, height: u32) -> f64 {
    let cx = width as f64 / 2.0;
    let cy = height as f64 / 2.0;
    let radius = width.min(height) as f64 * DOME_RADIUS_FRACTION;
    let dx = x as f64 + 0.5 - cx;
    let dy = y as f64 + 0.5 - cy;
    let rho = (dx * dx + dy * dy).sqrt() / radius;
    if rho >= 1.0 {
        0.0
    } else {
        (1.0 - rho * rho).sqrt()
    }
}

/// Color image of the scene.
pub fn render_color(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let profile = dome_profile(x, y, width, height);
        if profile > 0.0 {
            // Brighter toward the apex.
            let shade = 0.8 + 0.2 * profile;
            Rgb(FOOD_COLOR.map(|c| (c as f64 * shade).round() as u8))
        } else {
            Rgb(PLATE_COLOR)
        }
    })
}

/// Linear depth map of the scene.
pub fn render_depth(width: u32, height: u32) -> Result<RawDepthMap> {
    let mut samples = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            samples.push(PLATE_DISTANCE - DOME_HEIGHT * dome_profile(x, y, width, height));
        }
    }
    RawDepthMap::new(width, height, samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> CaptureConfig {
        CaptureConfig {
            url: url.to_string(),
            width: 64,
            height: 48,
            depth_width: 32,
            depth_height: 24,
            target_fps: 10,
        }
    }

    #[test]
    fn renders_color_and_depth_at_configured_sizes() -> Result<()> {
        let mut source = SyntheticSource::new(config("stub://plate"));
        source.connect()?;
        let frame = source.next_frame()?;
        assert_eq!(frame.color.dimensions(), (64, 48));
        let depth = frame.depth.ok_or_else(|| anyhow::anyhow!("missing depth"))?;
        assert_eq!((depth.width(), depth.height()), (32, 24));
        assert!(depth.get(16, 12) < PLATE_DISTANCE);
        assert_eq!(depth.get(0, 0), PLATE_DISTANCE);
        assert_eq!(source.stats().frames_captured, 1);
        Ok(())
    }

    #[test]
    fn nodepth_flag_omits_depth() -> Result<()> {
        let mut source = SyntheticSource::new(config("stub://plate?nodepth"));
        assert!(source.next_frame()?.depth.is_none());
        Ok(())
    }
}
