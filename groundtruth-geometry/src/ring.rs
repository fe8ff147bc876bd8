use crate::config::GeometryConfig;
use crate::mask::Mask;
use anyhow::Result;
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// Grows `mask` with a `kernel_size x kernel_size` square, `iterations` times.
///
/// The anchor sits at `kernel_size / 2`, so odd kernels grow symmetrically.
/// Pixels outside the image never contribute.
pub fn dilate(mask: &Mask, kernel_size: usize, iterations: usize) -> Mask {
    if kernel_size <= 1 || iterations == 0 || !mask.has_foreground() {
        return mask.clone();
    }
    if kernel_size % 2 == 0 {
        return dilate_even(mask, kernel_size, iterations);
    }

    let mut image = mask.to_gray_image();
    for _ in 0..iterations {
        // An odd square is a Chebyshev ball; large radii are Minkowski sums of smaller ones.
        let mut radius = kernel_size / 2;
        while radius > 0 {
            let step = radius.min(u8::MAX as usize);
            image = morphology::dilate(&image, Norm::LInf, step as u8);
            radius -= step;
        }
    }

    Mask::from_gray_image(&image)
}

/// Even squares have no center pixel, which `imageproc` cannot express: the
/// window covers `[i - k/2, i + k/2 - 1]`, one pixel shorter after the anchor than before it.
fn dilate_even(mask: &Mask, kernel_size: usize, iterations: usize) -> Mask {
    let (width, height) = (mask.width(), mask.height());
    let before = kernel_size / 2;
    let after = kernel_size - 1 - before;

    let mut current = mask.iter().by_vals().collect::<Vec<bool>>();
    for _ in 0..iterations {
        // rows first, then columns
        let mut rows = vec![false; width * height];
        for y in 0..height {
            let line = &current[y * width..(y + 1) * width];
            dilate_line(line, &mut rows[y * width..(y + 1) * width], before, after);
        }

        let mut column = vec![false; height];
        let mut grown = vec![false; height];
        for x in 0..width {
            for y in 0..height {
                column[y] = rows[y * width + x];
            }
            dilate_line(&column, &mut grown, before, after);
            for y in 0..height {
                current[y * width + x] = grown[y];
            }
        }
    }

    Mask::from_fn(width, height, |x, y| current[y * width + x])
}

/// 1D max filter over `[i - before, i + after]`, via prefix counts.
fn dilate_line(input: &[bool], output: &mut [bool], before: usize, after: usize) {
    let mut prefix = Vec::with_capacity(input.len() + 1);
    prefix.push(0usize);
    for &value in input {
        prefix.push(prefix.last().copied().unwrap_or(0) + value as usize);
    }

    for (i, out) in output.iter_mut().enumerate() {
        let start = i.saturating_sub(before);
        let end = (i + after + 1).min(input.len());
        *out = prefix[end] > prefix[start];
    }
}

/// The band of road immediately around a pothole: the dilated mask minus
/// the mask itself. Empty when dilation cannot grow the region.
pub fn road_ring(mask: &Mask, config: &GeometryConfig) -> Result<Mask> {
    dilate(mask, config.ring_kernel_size, config.ring_iterations).difference(mask)
}
