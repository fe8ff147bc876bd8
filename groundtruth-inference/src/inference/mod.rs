use anyhow::Result;
use groundtruth_geometry::{DepthMap, Mask};
use image::RgbImage;
use ndarray::{Array2, ArrayView2};

pub mod depth;
pub mod yolo;

/// Monocular metric depth estimation.
///
/// Implementations are built once per process and shared by every request
/// handler, so running them must not need `&mut self`.
pub trait DepthEstimation: Send + Sync {
    fn estimate_depth(&self, image: &RgbImage) -> Result<DepthMap>;
}

/// Pothole instance segmentation. Masks come back in the detector's order,
/// each at whatever resolution the detector works in.
pub trait PotholeSegmentation: Send + Sync {
    fn segment_potholes(&self, image: &RgbImage) -> Result<Vec<Mask>>;
}

/// Bilinear resize with pixel-center alignment.
pub(super) fn linear_interpolate(input: ArrayView2<f32>, new_shape: (usize, usize)) -> Array2<f32> {
    let (old_height, old_width) = input.dim();
    let (new_height, new_width) = new_shape;
    if old_height == 0 || old_width == 0 {
        return Array2::zeros(new_shape);
    }

    // (low index, high index, weight of high)
    let taps = |new: usize, old: usize| {
        (0..new)
            .map(|i| {
                let position = ((i as f32 + 0.5) * old as f32 / new as f32 - 0.5).max(0.0);
                let low = (position.floor() as usize).min(old - 1);
                let high = (low + 1).min(old - 1);
                (low, high, position - low as f32)
            })
            .collect::<Vec<_>>()
    };
    let rows = taps(new_height, old_height);
    let cols = taps(new_width, old_width);

    Array2::from_shape_fn((new_height, new_width), |(i, j)| {
        let (y0, y1, dy) = rows[i];
        let (x0, x1, dx) = cols[j];

        let p00 = input[[y0, x0]];
        let p01 = input[[y0, x1]];
        let p10 = input[[y1, x0]];
        let p11 = input[[y1, x1]];

        p00 * (1.0 - dx) * (1.0 - dy) + p01 * dx * (1.0 - dy) + p10 * (1.0 - dx) * dy + p11 * dx * dy
    })
}

pub(super) fn sigmoid(arr: Array2<f32>) -> Array2<f32> {
    arr.mapv(|x| 1.0 / (1.0 + (-x).exp()))
}
