//! Colored point clouds built from depth-bearing region estimates.
//!
//! Coordinates are meters in the base-plane frame: `x` to the right, `y` up,
//! `z` the height above the plate.

use std::path::Path;

use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use las::{Builder, Color, Point, Writer};

use crate::pipeline::RegionEstimate;

/// Quantization step written to the LAS header, meters.
const LAS_SCALE: f64 = 0.0001;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColoredPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub rgb: [u8; 3],
}

#[derive(Clone, Debug, Default)]
pub struct PointCloud {
    points: Vec<ColoredPoint>,
}

impl PointCloud {
    /// One point per masked pixel of the region's depth crop.
    pub fn from_region(region: &RegionEstimate) -> Result<Self> {
        let depth = region
            .depth
            .as_ref()
            .ok_or_else(|| anyhow!("region has no depth data"))?;
        let full = depth.calibrated.depth().size();
        let (crop_w, crop_h) = (depth.crop.width(), depth.crop.height());
        let colors = imageops::resize(&region.cropped_image, crop_w, crop_h, FilterType::Triangle);
        let base = depth.calibrated.base_depth();
        let width = depth.calibrated.physical_width();
        let height = depth.calibrated.physical_height();

        let mut points = Vec::with_capacity(depth.mask.foreground_count());
        for row in 0..crop_h {
            for col in 0..crop_w {
                if !depth.mask.is_foreground(col, row) {
                    continue;
                }
                let gx = (depth.rect.x + col) as f64;
                let gy = (depth.rect.y + row) as f64;
                points.push(ColoredPoint {
                    x: (gx / full.width as f64 - 0.5) * width,
                    y: -(gy / full.height as f64 - 0.5) * height,
                    z: base - depth.crop.get(col, row),
                    rgb: colors.get_pixel(col, row).0,
                });
            }
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[ColoredPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Write as an uncompressed LAS 1.4 file with color.
    pub fn write_las(&self, path: &Path) -> Result<()> {
        if self.points.is_empty() {
            return Err(anyhow!("no points to export"));
        }
        let (min_x, max_x) = bounds(self.points.iter().map(|p| p.x));
        let (min_y, max_y) = bounds(self.points.iter().map(|p| p.y));
        let (min_z, max_z) = bounds(self.points.iter().map(|p| p.z));

        let mut builder = Builder::from((1, 4));
        builder.point_format.has_color = true;
        builder.point_format.is_compressed = false;
        builder.transforms = las::Vector {
            x: las::Transform {
                scale: LAS_SCALE,
                offset: (min_x + max_x) / 2.0,
            },
            y: las::Transform {
                scale: LAS_SCALE,
                offset: (min_y + max_y) / 2.0,
            },
            z: las::Transform {
                scale: LAS_SCALE,
                offset: (min_z + max_z) / 2.0,
            },
        };
        let header = builder
            .into_header()
            .map_err(|e| anyhow!("failed to build LAS header: {}", e))?;
        let mut writer = Writer::from_path(path, header)
            .map_err(|e| anyhow!("failed to create {}: {}", path.display(), e))?;

        for p in &self.points {
            let [r, g, b] = p.rgb;
            let point = Point {
                x: p.x,
                y: p.y,
                z: p.z,
                color: Some(Color::new(r as u16 * 256, g as u16 * 256, b as u16 * 256)),
                ..Default::default()
            };
            writer
                .write_point(point)
                .map_err(|e| anyhow!("failed to write point: {}", e))?;
        }
        writer
            .close()
            .map_err(|e| anyhow!("failed to close {}: {}", path.display(), e))?;

        log::info!("wrote {} points to {}", self.points.len(), path.display());
        Ok(())
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::MAX, f64::MIN), |(min, max), v| (min.min(v), max.max(v)))
}
