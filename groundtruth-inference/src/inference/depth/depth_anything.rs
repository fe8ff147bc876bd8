use crate::engine::inference_engine::{ExecutionProvider, OnnxSession};
use crate::inference::DepthEstimation;
use crate::utils::extractor::{ExtraToTensor, IMAGENET_MEAN, IMAGENET_STD};
use anyhow::{ensure, Context, Result};
use groundtruth_geometry::DepthMap;
use image::imageops::{self, FilterType};
use image::RgbImage;
use log::debug;
use ort::value::Tensor;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthAnythingOptions {
    /// Target side length before the aspect-ratio adjustment.
    pub input_size: u32,
    /// The ViT patch size; both input sides are rounded to a multiple of it.
    pub multiple_of: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for DepthAnythingOptions {
    fn default() -> Self {
        Self {
            input_size: 518,
            multiple_of: 14,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }
}

/// Model input `(width, height)` for an image of `width x height`.
///
/// Keeps the aspect ratio and scales by whichever factor is closest to 1,
/// then rounds both sides to a multiple of `multiple_of`.
pub fn depth_input_size(width: u32, height: u32, target: u32, multiple_of: u32) -> (u32, u32) {
    let scale_height = target as f64 / height.max(1) as f64;
    let scale_width = target as f64 / width.max(1) as f64;
    let scale = if (1.0 - scale_width).abs() < (1.0 - scale_height).abs() {
        scale_width
    } else {
        scale_height
    };

    let multiple = multiple_of.max(1) as f64;
    let constrain = |value: f64| ((value / multiple).round() * multiple).max(multiple) as u32;

    (
        constrain(width as f64 * scale),
        constrain(height as f64 * scale),
    )
}

/// Depth Anything V2 metric model. Produces depth at the model's working
/// resolution, not at the input image size.
pub struct DepthAnythingSession {
    session: Mutex<OnnxSession>,
    options: DepthAnythingOptions,
}

impl DepthAnythingSession {
    pub fn new(
        model_path: impl AsRef<Path>,
        executor: ExecutionProvider,
        intra_threads: usize,
        options: DepthAnythingOptions,
    ) -> Result<Self> {
        Ok(Self {
            session: Mutex::new(OnnxSession::new(model_path, executor, intra_threads)?),
            options,
        })
    }
}

impl DepthEstimation for DepthAnythingSession {
    fn estimate_depth(&self, image: &RgbImage) -> Result<DepthMap> {
        let (width, height) = depth_input_size(
            image.width(),
            image.height(),
            self.options.input_size,
            self.options.multiple_of,
        );
        let resized = imageops::resize(image, width, height, FilterType::CatmullRom);
        let tensor = Tensor::from_array(
            resized.extra_normalized_image_to_tensor(self.options.mean, self.options.std),
        )?;

        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![tensor])?;
        debug!("Finish running depth model on {}x{}", width, height);

        let (_, predicted) = outputs
            .iter()
            .next()
            .context("Depth model returned no output")?;
        let predicted = predicted.try_extract_array::<f32>()?;

        let shape = predicted.shape();
        ensure!(shape.len() >= 2, "Unexpected depth output shape {:?}", shape);
        let (rows, cols) = (shape[shape.len() - 2], shape[shape.len() - 1]);
        ensure!(
            predicted.len() == rows * cols,
            "Depth output {:?} holds more than one map",
            shape
        );

        DepthMap::from_shape_vec(cols, rows, predicted.iter().copied().collect())
    }
}
