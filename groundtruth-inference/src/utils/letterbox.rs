use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// Gray used by YOLO exports to pad letterboxed input.
pub const LETTERBOX_FILL: Rgb<u8> = Rgb([114, 114, 114]);

/// Aspect-preserving fit of an image into a `size x size` square, centered,
/// with the remainder padded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub size: u32,
    pub scale: f32,
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub pad_x: u32,
    pub pad_y: u32,
}

impl Letterbox {
    pub fn new(width: u32, height: u32, size: u32) -> Self {
        let scale = (size as f32 / width.max(1) as f32).min(size as f32 / height.max(1) as f32);
        let scaled_width = ((width as f32 * scale).round() as u32).clamp(1, size);
        let scaled_height = ((height as f32 * scale).round() as u32).clamp(1, size);

        Self {
            size,
            scale,
            scaled_width,
            scaled_height,
            pad_x: (size - scaled_width) / 2,
            pad_y: (size - scaled_height) / 2,
        }
    }

    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        let resized = imageops::resize(
            image,
            self.scaled_width,
            self.scaled_height,
            FilterType::Triangle,
        );

        let mut canvas = RgbImage::from_pixel(self.size, self.size, LETTERBOX_FILL);
        imageops::replace(&mut canvas, &resized, self.pad_x as i64, self.pad_y as i64);
        canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_pads_vertically() {
        let letterbox = Letterbox::new(1280, 720, 640);
        assert_eq!(letterbox.scaled_width, 640);
        assert_eq!(letterbox.scaled_height, 360);
        assert_eq!((letterbox.pad_x, letterbox.pad_y), (0, 140));
    }

    #[test]
    fn portrait_pads_horizontally() {
        let letterbox = Letterbox::new(300, 600, 640);
        assert_eq!((letterbox.scaled_width, letterbox.scaled_height), (320, 640));
        assert_eq!((letterbox.pad_x, letterbox.pad_y), (160, 0));
    }

    #[test]
    fn padding_uses_fill_color() {
        let image = RgbImage::from_pixel(64, 32, Rgb([255, 0, 0]));
        let letterbox = Letterbox::new(64, 32, 64);
        let canvas = letterbox.apply(&image);

        assert_eq!(canvas.dimensions(), (64, 64));
        assert_eq!(*canvas.get_pixel(10, 0), LETTERBOX_FILL);
        assert_eq!(*canvas.get_pixel(10, 32), Rgb([255, 0, 0]));
        assert_eq!(*canvas.get_pixel(10, 63), LETTERBOX_FILL);
    }
}
