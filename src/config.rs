use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::depth::{
    BaseDepthWeighting, CalibrationParams, DepthCalibrator, DEFAULT_BASE_DEPTH_CORRECTION,
    DEFAULT_DEPTH_INTERCEPT, DEFAULT_DEPTH_SLOPE, DEFAULT_IGNORE_FRACTION,
};
use crate::food::{default_coefficients, CalorieRegressor, Coefficients, FoodClass};

const DEFAULT_Y_FOV_DEG: f64 = 60.0;
const DEFAULT_CAPTURE_URL: &str = "stub://plate";
const DEFAULT_CAPTURE_FPS: u32 = 10;
const DEFAULT_CAPTURE_WIDTH: u32 = 640;
const DEFAULT_CAPTURE_HEIGHT: u32 = 480;
const DEFAULT_DEPTH_WIDTH: u32 = 320;
const DEFAULT_DEPTH_HEIGHT: u32 = 240;
const DEFAULT_CLASSIFIER_INPUT: u32 = 299;
const DEFAULT_SEGMENTER_INPUT: u32 = 560;
const DEFAULT_MASK_THRESHOLD: f32 = 0.5;

#[derive(Debug, Deserialize, Default)]
struct EstimatorConfigFile {
    calibration: Option<CalibrationConfigFile>,
    camera: Option<CameraConfigFile>,
    capture: Option<CaptureConfigFile>,
    models: Option<ModelsConfigFile>,
    regression: Option<HashMap<FoodClass, Coefficients>>,
    dump_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct CalibrationConfigFile {
    slope: Option<f64>,
    intercept: Option<f64>,
    ignore_fraction: Option<f64>,
    base_depth_correction: Option<f64>,
    base_depth_weighting: Option<BaseDepthWeighting>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    y_fov_deg: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    depth_width: Option<u32>,
    depth_height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelsConfigFile {
    classifier_path: Option<PathBuf>,
    classifier_input: Option<u32>,
    segmenter_path: Option<PathBuf>,
    segmenter_input: Option<u32>,
    mask_threshold: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    pub calibration: CalibrationParams,
    pub camera: CameraSettings,
    pub capture: CaptureSettings,
    pub models: ModelSettings,
    pub regression: HashMap<FoodClass, Coefficients>,
    pub dump_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    /// Vertical field of view, degrees.
    pub y_fov_deg: f64,
}

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub depth_width: u32,
    pub depth_height: u32,
    pub target_fps: u32,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub classifier_path: Option<PathBuf>,
    pub classifier_input: u32,
    pub segmenter_path: Option<PathBuf>,
    pub segmenter_input: u32,
    pub mask_threshold: f32,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self::from_file(EstimatorConfigFile::default())
    }
}

impl EstimatorConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("CALORIE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn calibrator(&self) -> DepthCalibrator {
        DepthCalibrator::new(self.calibration, self.camera.y_fov_deg)
    }

    pub fn regressor(&self) -> CalorieRegressor {
        CalorieRegressor::new(self.regression.clone())
    }

    fn from_file(file: EstimatorConfigFile) -> Self {
        let calibration = file.calibration.unwrap_or_default();
        let calibration = CalibrationParams {
            slope: calibration.slope.unwrap_or(DEFAULT_DEPTH_SLOPE),
            intercept: calibration.intercept.unwrap_or(DEFAULT_DEPTH_INTERCEPT),
            ignore_fraction: calibration.ignore_fraction.unwrap_or(DEFAULT_IGNORE_FRACTION),
            base_depth_correction: calibration
                .base_depth_correction
                .unwrap_or(DEFAULT_BASE_DEPTH_CORRECTION),
            weighting: calibration.base_depth_weighting.unwrap_or_default(),
        };
        let camera = CameraSettings {
            y_fov_deg: file
                .camera
                .and_then(|camera| camera.y_fov_deg)
                .unwrap_or(DEFAULT_Y_FOV_DEG),
        };
        let capture = file.capture.unwrap_or_default();
        let capture = CaptureSettings {
            url: capture
                .url
                .unwrap_or_else(|| DEFAULT_CAPTURE_URL.to_string()),
            width: capture.width.unwrap_or(DEFAULT_CAPTURE_WIDTH),
            height: capture.height.unwrap_or(DEFAULT_CAPTURE_HEIGHT),
            depth_width: capture.depth_width.unwrap_or(DEFAULT_DEPTH_WIDTH),
            depth_height: capture.depth_height.unwrap_or(DEFAULT_DEPTH_HEIGHT),
            target_fps: capture.target_fps.unwrap_or(DEFAULT_CAPTURE_FPS),
        };
        let models = file.models.unwrap_or_default();
        let models = ModelSettings {
            classifier_path: models.classifier_path,
            classifier_input: models.classifier_input.unwrap_or(DEFAULT_CLASSIFIER_INPUT),
            segmenter_path: models.segmenter_path,
            segmenter_input: models.segmenter_input.unwrap_or(DEFAULT_SEGMENTER_INPUT),
            mask_threshold: models.mask_threshold.unwrap_or(DEFAULT_MASK_THRESHOLD),
        };
        // Entries in the file override the reference fit class by class.
        let mut regression: HashMap<FoodClass, Coefficients> = FoodClass::ALL
            .into_iter()
            .map(|class| (class, default_coefficients(class)))
            .collect();
        regression.extend(file.regression.unwrap_or_default());

        Self {
            calibration,
            camera,
            capture,
            models,
            regression,
            dump_dir: file.dump_dir,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("CALORIE_CAPTURE_URL") {
            if !url.trim().is_empty() {
                self.capture.url = url;
            }
        }
        if let Some(fov) = env_f64("CALORIE_Y_FOV_DEG")? {
            self.camera.y_fov_deg = fov;
        }
        if let Some(slope) = env_f64("CALORIE_DEPTH_SLOPE")? {
            self.calibration.slope = slope;
        }
        if let Some(intercept) = env_f64("CALORIE_DEPTH_INTERCEPT")? {
            self.calibration.intercept = intercept;
        }
        if let Some(fraction) = env_f64("CALORIE_DEPTH_IGNORE_FRACTION")? {
            self.calibration.ignore_fraction = fraction;
        }
        if let Ok(dir) = std::env::var("CALORIE_DUMP_DIR") {
            if !dir.trim().is_empty() {
                self.dump_dir = Some(PathBuf::from(dir));
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let c = &self.calibration;
        if !(0.0..1.0).contains(&c.ignore_fraction) {
            return Err(anyhow!(
                "calibration.ignore_fraction must be in [0, 1), got {}",
                c.ignore_fraction
            ));
        }
        if !c.slope.is_finite() || !c.intercept.is_finite() {
            return Err(anyhow!("calibration slope and intercept must be finite"));
        }
        if !(c.base_depth_correction.is_finite() && c.base_depth_correction > 0.0) {
            return Err(anyhow!("calibration.base_depth_correction must be greater than zero"));
        }
        let fov = self.camera.y_fov_deg;
        if !(fov > 0.0 && fov < 180.0) {
            return Err(anyhow!("camera.y_fov_deg must be in (0, 180), got {}", fov));
        }

        let cap = &self.capture;
        if cap.width == 0 || cap.height == 0 || cap.depth_width == 0 || cap.depth_height == 0 {
            return Err(anyhow!("capture dimensions must be greater than zero"));
        }
        if cap.target_fps == 0 {
            return Err(anyhow!("capture.target_fps must be greater than zero"));
        }

        let models = &self.models;
        if models.classifier_input == 0 || models.segmenter_input == 0 {
            return Err(anyhow!("model input sizes must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&models.mask_threshold) {
            return Err(anyhow!(
                "models.mask_threshold must be in [0, 1], got {}",
                models.mask_threshold
            ));
        }

        for class in FoodClass::ALL {
            let coefs = self
                .regression
                .get(&class)
                .ok_or_else(|| anyhow!("regression table is missing class '{}'", class.key()))?;
            if !coefs.slope.is_finite() || !coefs.intercept.is_finite() {
                return Err(anyhow!(
                    "regression coefficients for '{}' must be finite",
                    class.key()
                ));
            }
        }
        Ok(())
    }
}

fn env_f64(key: &str) -> Result<Option<f64>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a number", key)),
        _ => Ok(None),
    }
}

fn read_config_file(path: &Path) -> Result<EstimatorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
