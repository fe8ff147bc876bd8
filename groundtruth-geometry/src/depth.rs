use crate::mask::Mask;
use anyhow::{ensure, Result};
use ndarray::Array2;
use std::ops::Deref;

/// Metric depth along the optical axis, one value per pixel, in meters.
/// Indexed as `[[y, x]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap(Array2<f32>);

impl Deref for DepthMap {
    type Target = Array2<f32>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DepthMap {
    pub fn new(depth: Array2<f32>) -> Result<Self> {
        let (height, width) = depth.dim();
        ensure!(
            width > 0 && height > 0,
            "Depth map must not be empty, got {}x{}",
            width,
            height
        );

        Ok(Self(depth))
    }

    pub fn from_shape_vec(width: usize, height: usize, values: Vec<f32>) -> Result<Self> {
        Self::new(Array2::from_shape_vec((height, width), values)?)
    }

    pub fn width(&self) -> usize {
        self.0.ncols()
    }

    pub fn height(&self) -> usize {
        self.0.nrows()
    }

    /// Depth values under the foreground of `mask`.
    ///
    /// Non-finite readings carry no distance information and are left out.
    pub fn sample(&self, mask: &Mask) -> Result<Vec<f32>> {
        ensure!(
            mask.width() == self.width() && mask.height() == self.height(),
            "Mask {}x{} is not aligned with depth map {}x{}",
            mask.width(),
            mask.height(),
            self.width(),
            self.height()
        );

        Ok(mask
            .foreground()
            .map(|(x, y)| self.0[[y, x]])
            .filter(|depth| depth.is_finite())
            .collect())
    }

    pub fn into_inner(self) -> Array2<f32> {
        self.0
    }
}
