use anyhow::{ensure, Result};
use bitvec::prelude::*;
use image::{GrayImage, Luma};
use std::ops::Deref;

/// Binary per-pixel membership for one detected instance.
/// Bits are stored row-major: `bits[y * width + x]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    bits: BitVec,
    width: usize,
    height: usize,
}

impl Deref for Mask {
    type Target = BitVec;

    fn deref(&self) -> &Self::Target {
        &self.bits
    }
}

impl Mask {
    pub fn new(bits: BitVec, width: usize, height: usize) -> Result<Self> {
        ensure!(
            bits.len() == width * height,
            "Mask length mismatch: {} vs {}x{}",
            bits.len(),
            width,
            height
        );

        Ok(Self {
            bits,
            width,
            height,
        })
    }

    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            bits: BitVec::repeat(false, width * height),
            width,
            height,
        }
    }

    /// Builds a mask by evaluating `inside(x, y)` for every pixel.
    pub fn from_fn(width: usize, height: usize, inside: impl Fn(usize, usize) -> bool) -> Self {
        let bits = (0..width * height)
            .map(|index| inside(index % width, index / width))
            .collect::<BitVec>();

        Self {
            bits,
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.bits[y * self.width + x]
    }

    pub fn foreground_count(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn has_foreground(&self) -> bool {
        self.bits.any()
    }

    /// Foreground pixel coordinates as `(x, y)`, row-major order.
    pub fn foreground(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let width = self.width;
        self.bits
            .iter_ones()
            .map(move |index| (index % width, index / width))
    }

    /// Resamples the mask to `width x height` by nearest neighbour.
    ///
    /// Every output pixel copies the source pixel at
    /// `floor(dst * src_size / dst_size)`, so no fractional membership can
    /// appear at region boundaries.
    pub fn resize_nearest(&self, width: usize, height: usize) -> Mask {
        if width == self.width && height == self.height {
            return self.clone();
        }
        if self.width == 0 || self.height == 0 {
            return Mask::empty(width, height);
        }

        let source_x = (0..width)
            .map(|x| (x * self.width / width).min(self.width - 1))
            .collect::<Vec<_>>();

        let mut bits = BitVec::with_capacity(width * height);
        for y in 0..height {
            let row = (y * self.height / height).min(self.height - 1) * self.width;
            bits.extend(source_x.iter().map(|&x| self.bits[row + x]));
        }

        Mask {
            bits,
            width,
            height,
        }
    }

    /// 0/255 grayscale view for `imageproc` morphology.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            Luma([if self.bits[y as usize * self.width + x as usize] { 255 } else { 0 }])
        })
    }

    /// Any non-zero pixel is foreground.
    pub fn from_gray_image(image: &GrayImage) -> Mask {
        Mask {
            bits: image.pixels().map(|pixel| pixel.0[0] > 0).collect(),
            width: image.width() as usize,
            height: image.height() as usize,
        }
    }

    /// Pixels set in `self` but not in `other`.
    pub fn difference(&self, other: &Mask) -> Result<Mask> {
        ensure!(
            self.width == other.width && self.height == other.height,
            "Mask size mismatch: {}x{} vs {}x{}",
            self.width,
            self.height,
            other.width,
            other.height
        );

        let bits = self
            .bits
            .iter()
            .by_vals()
            .zip(other.bits.iter().by_vals())
            .map(|(inside, removed)| inside && !removed)
            .collect::<BitVec>();

        Ok(Mask {
            bits,
            width: self.width,
            height: self.height,
        })
    }

    pub fn intersects(&self, other: &Mask) -> bool {
        self.bits
            .iter_ones()
            .any(|index| index < other.bits.len() && other.bits[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: usize, from: usize, to: usize) -> Mask {
        Mask::from_fn(size, size, |x, y| (from..to).contains(&x) && (from..to).contains(&y))
    }

    #[test]
    fn rejects_length_mismatch() {
        assert!(Mask::new(bitvec![0; 10], 3, 3).is_err());
        assert!(Mask::new(bitvec![0; 9], 3, 3).is_ok());
    }

    #[test]
    fn foreground_reports_xy() {
        let mask = Mask::from_fn(4, 3, |x, y| x == 3 && y == 1);
        assert_eq!(mask.foreground().collect::<Vec<_>>(), vec![(3, 1)]);
        assert!(mask.get(3, 1));
        assert!(!mask.get(4, 1));
    }

    #[test]
    fn upsampling_replicates_pixels() {
        let mask = Mask::from_fn(2, 2, |x, y| x == y);
        let resized = mask.resize_nearest(4, 4);

        let expected = Mask::from_fn(4, 4, |x, y| x / 2 == y / 2);
        assert_eq!(resized, expected);
    }

    #[test]
    fn downsampling_keeps_foreground_fraction() {
        let mask = square(100, 25, 75);
        let resized = mask.resize_nearest(40, 40);

        let before = mask.foreground_count() as f64 / (100.0 * 100.0);
        let after = resized.foreground_count() as f64 / (40.0 * 40.0);
        // each target pixel stands for 2.5 source pixels per axis
        assert!((before - after).abs() < 0.05, "{before} vs {after}");
    }

    #[test]
    fn resize_to_same_size_is_identity() {
        let mask = square(16, 4, 9);
        assert_eq!(mask.resize_nearest(16, 16), mask);
    }

    #[test]
    fn difference_removes_overlap() -> Result<()> {
        let outer = square(10, 2, 8);
        let inner = square(10, 4, 6);
        let ring = outer.difference(&inner)?;

        assert_eq!(ring.foreground_count(), 36 - 4);
        assert!(!ring.intersects(&inner));
        assert!(outer.difference(&Mask::empty(5, 5)).is_err());
        Ok(())
    }

    #[test]
    fn gray_image_is_binary_and_row_major() {
        let mask = Mask::from_fn(5, 3, |x, y| x == 4 && y == 2);
        let image = mask.to_gray_image();

        assert_eq!(image.dimensions(), (5, 3));
        assert_eq!(image.get_pixel(4, 2).0[0], 255);
        assert_eq!(image.pixels().filter(|pixel| pixel.0[0] != 0).count(), 1);
        assert_eq!(Mask::from_gray_image(&image), mask);
    }
}
