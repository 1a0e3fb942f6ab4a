#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;
use tract_onnx::prelude::*;

use crate::detect::backend::{RegionClassifier, RegionSegmenter};
use crate::food::ClassPrediction;
use crate::geometry::Size;
use crate::mask::SegmentationMask;

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

fn load_square_model(model_path: &Path, side: u32) -> Result<OnnxPlan> {
    tract_onnx::onnx()
        .model_for_path(model_path)
        .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
        .with_input_fact(
            0,
            InferenceFact::dt_shape(
                f32::datum_type(),
                tvec!(1, 3, side as usize, side as usize),
            ),
        )
        .context("failed to set input fact")?
        .into_optimized()
        .context("failed to optimize ONNX model")?
        .into_runnable()
        .context("failed to build runnable ONNX model")
}

/// Resize to `side`×`side` and pack as a normalized NCHW tensor.
fn build_input(image: &RgbImage, side: u32) -> Result<Tensor> {
    if image.width() == 0 || image.height() == 0 {
        return Err(anyhow!("cannot run inference on an empty crop"));
    }
    let resized = imageops::resize(image, side, side, FilterType::Triangle);
    let input = tract_ndarray::Array4::from_shape_fn(
        (1, 3, side as usize, side as usize),
        |(_, channel, y, x)| resized.get_pixel(x as u32, y as u32).0[channel] as f32 / 255.0,
    );
    Ok(input.into_tensor())
}

/// ONNX food classifier (Xception-style, softmax over the class list).
pub struct TractClassifier {
    model: OnnxPlan,
    input_size: u32,
}

impl TractClassifier {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model = load_square_model(model_path.as_ref(), input_size)?;
        Ok(Self { model, input_size })
    }
}

impl RegionClassifier for TractClassifier {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn predict(&self, image: &RgbImage) -> Result<ClassPrediction> {
        let input = build_input(image, self.input_size)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX classification failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let scores = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        let (class_index, confidence) = scores
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (i, score)| match best {
                Some((_, top)) if top >= score => best,
                _ => Some((i, score)),
            })
            .ok_or_else(|| anyhow!("model produced an empty score vector"))?;

        Ok(ClassPrediction {
            class_index,
            confidence,
        })
    }
}

/// ONNX foreground segmenter (U-Net style, one probability channel).
pub struct TractSegmenter {
    model: OnnxPlan,
    input_size: u32,
    threshold: f32,
}

impl TractSegmenter {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model = load_square_model(model_path.as_ref(), input_size)?;
        Ok(Self {
            model,
            input_size,
            threshold: 0.5,
        })
    }

    /// Override the default foreground probability threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

impl RegionSegmenter for TractSegmenter {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn working_size(&self) -> Size {
        Size::new(self.input_size, self.input_size)
    }

    fn predict(&self, image: &RgbImage) -> Result<SegmentationMask> {
        let input = build_input(image, self.input_size)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX segmentation failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let features = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        let side = self.input_size as usize;
        if features.len() != side * side {
            return Err(anyhow!(
                "segmentation output has {} values, expected {}x{}",
                features.len(),
                side,
                side
            ));
        }
        let values: Vec<bool> = features.iter().map(|&p| p > self.threshold).collect();
        SegmentationMask::from_bools(self.input_size, self.input_size, &values)
    }
}
