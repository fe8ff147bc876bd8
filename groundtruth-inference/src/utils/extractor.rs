use image::RgbImage;
use ndarray::{Array4, Axis, Zip};

pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Converts an RGB image into a `[1, 3, H, W]` float tensor.
pub trait ExtraToTensor {
    /// Pixels scaled to `[0, 1]`.
    fn extra_standard_image_to_tensor(&self) -> Array4<f32>;

    /// Pixels scaled to `[0, 1]`, then normalised per channel.
    fn extra_normalized_image_to_tensor(&self, mean: [f32; 3], std: [f32; 3]) -> Array4<f32>;
}

impl ExtraToTensor for RgbImage {
    fn extra_standard_image_to_tensor(&self) -> Array4<f32> {
        self.extra_normalized_image_to_tensor([0.0; 3], [1.0; 3])
    }

    fn extra_normalized_image_to_tensor(&self, mean: [f32; 3], std: [f32; 3]) -> Array4<f32> {
        let (width, height) = (self.width() as usize, self.height() as usize);
        let mut tensor = Array4::<f32>::zeros((1, 3, height, width));

        for (channel, mut plane) in tensor
            .index_axis_mut(Axis(0), 0)
            .axis_iter_mut(Axis(0))
            .enumerate()
        {
            Zip::indexed(&mut plane).par_for_each(|(y, x), value| {
                let pixel = self.get_pixel(x as u32, y as u32);
                *value = (pixel[channel] as f32 / 255. - mean[channel]) / std[channel];
            });
        }

        tensor
    }
}
