use crate::engine::inference_engine::{ExecutionProvider, OnnxSession};
use crate::inference::yolo::NMSImplement;
use crate::inference::{linear_interpolate, sigmoid, PotholeSegmentation};
use crate::utils::extractor::ExtraToTensor;
use crate::utils::graph::{BoundingBox, Point};
use crate::utils::letterbox::Letterbox;
use anyhow::{ensure, Result};
use bitvec::prelude::*;
use groundtruth_geometry::Mask;
use image::RgbImage;
use log::debug;
use ndarray::{s, Array2, Array3, ArrayView1, ArrayView2, Axis, Ix3, Ix4};
use ort::value::Tensor;
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of prototype masks in a YOLOv8-seg head.
const MASK_PROTOTYPES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YoloSegmentOptions {
    /// Side of the square model input.
    pub input_size: u32,
    pub confidence: f32,
    pub iou_threshold: f32,
    pub mask_threshold: f32,
    /// Keep only this class index; every class when unset.
    pub class_filter: Option<usize>,
}

impl Default for YoloSegmentOptions {
    fn default() -> Self {
        Self {
            input_size: 640,
            confidence: 0.25,
            iou_threshold: 0.7,
            mask_threshold: 0.5,
            class_filter: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct YoloSegmentDetection {
    /// Box in letterboxed input coordinates.
    pub boxed: BoundingBox<f32>,
    pub classify: usize,
    pub score: f32,
    pub(crate) coefficients: Vec<f32>,
}

pub struct YoloSegmentSession {
    session: Mutex<OnnxSession>,
    options: YoloSegmentOptions,
}

impl YoloSegmentSession {
    pub fn new(
        model_path: impl AsRef<Path>,
        executor: ExecutionProvider,
        intra_threads: usize,
        options: YoloSegmentOptions,
    ) -> Result<Self> {
        Ok(Self {
            session: Mutex::new(OnnxSession::new(model_path, executor, intra_threads)?),
            options,
        })
    }

    /// Raw head outputs: predictions as `[anchors, 4 + classes + 32]` and
    /// prototypes as `[32, mh, mw]`.
    fn run_model(&self, image: &RgbImage) -> Result<(Array2<f32>, Array3<f32>)> {
        let tensor = Tensor::from_array(image.extra_standard_image_to_tensor())?;

        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![tensor])?;
        debug!("Finish running segmentation model");

        let predictions = outputs["output0"]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix3>()?
            .index_axis(Axis(0), 0)
            .t()
            .to_owned();
        let prototypes = outputs["output1"]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix4>()?
            .index_axis(Axis(0), 0)
            .to_owned();

        debug!("predictions: {:?}", predictions.shape());
        debug!("prototypes: {:?}", prototypes.shape());

        Ok((predictions, prototypes))
    }
}

impl PotholeSegmentation for YoloSegmentSession {
    fn segment_potholes(&self, image: &RgbImage) -> Result<Vec<Mask>> {
        let letterbox = Letterbox::new(image.width(), image.height(), self.options.input_size);
        let (predictions, prototypes) = self.run_model(&letterbox.apply(image))?;

        let detections = decode_detections(
            predictions.view(),
            self.options.confidence,
            self.options.class_filter,
        )?
        .non_maximum_suppression(self.options.iou_threshold);
        debug!("{} detections after suppression", detections.len());

        detections
            .par_iter()
            .map(|detection| {
                decode_mask(detection, &prototypes, &letterbox, self.options.mask_threshold)
            })
            .collect()
    }
}

/// Keeps rows whose best class score exceeds `confidence`.
pub(crate) fn decode_detections(
    predictions: ArrayView2<f32>,
    confidence: f32,
    class_filter: Option<usize>,
) -> Result<Vec<YoloSegmentDetection>> {
    let columns = predictions.ncols();
    ensure!(
        columns > 4 + MASK_PROTOTYPES,
        "Unexpected segmentation head width {}",
        columns
    );
    let class_end = columns - MASK_PROTOTYPES;

    let detections = predictions
        .axis_iter(Axis(0))
        .into_par_iter()
        .filter_map(|row| {
            let scores = row.slice(s![4..class_end]);
            let (classify, score) = match class_filter {
                Some(class) => (class, *scores.get(class)?),
                None => scores
                    .iter()
                    .copied()
                    .enumerate()
                    .max_by(|(_, a), (_, b)| a.total_cmp(b))?,
            };
            if score <= confidence {
                return None;
            }

            Some(YoloSegmentDetection {
                boxed: BoundingBox::from_center(Point { x: row[0], y: row[1] }, row[2], row[3]),
                classify,
                score,
                coefficients: row.slice(s![class_end..]).to_vec(),
            })
        })
        .collect();

    Ok(detections)
}

/// Combines prototypes into one instance mask, cropped to the detection box
/// and to the un-padded part of the letterbox.
pub(crate) fn decode_mask(
    detection: &YoloSegmentDetection,
    prototypes: &Array3<f32>,
    letterbox: &Letterbox,
    mask_threshold: f32,
) -> Result<Mask> {
    let (count, proto_height, proto_width) = prototypes.dim();
    ensure!(
        detection.coefficients.len() == count,
        "Mask coefficients {} do not match {} prototypes",
        detection.coefficients.len(),
        count
    );

    let flat = prototypes
        .view()
        .into_shape_with_order((count, proto_height * proto_width))?;
    let logits = ArrayView1::from(detection.coefficients.as_slice())
        .dot(&flat)
        .into_shape_with_order((proto_height, proto_width))?;

    let size = letterbox.size as usize;
    let probabilities = linear_interpolate(sigmoid(logits).view(), (size, size));

    let (width, height) = (
        letterbox.scaled_width as usize,
        letterbox.scaled_height as usize,
    );
    let (pad_x, pad_y) = (letterbox.pad_x as usize, letterbox.pad_y as usize);

    let bits = (0..width * height)
        .map(|index| {
            let (x, y) = (index % width + pad_x, index / width + pad_y);
            detection.boxed.contains(Point {
                x: x as f32,
                y: y as f32,
            }) && probabilities[[y, x]] > mask_threshold
        })
        .collect::<BitVec>();

    Mask::new(bits, width, height)
}
