use crate::camera::PinholeCamera;
use crate::config::WidthMode;
use crate::mask::Mask;
use crate::measurement::PotholeMeasurement;

/// Median of `values`; the mean of the two middle values for even counts.
/// Reorders the slice in place.
pub fn median(values: &mut [f32]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let len = values.len();
    let (lower_half, upper, _) = values.select_nth_unstable_by(len / 2, f32::total_cmp);
    let upper = *upper as f64;
    if len % 2 == 1 {
        return Some(upper);
    }

    let lower = lower_half
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max) as f64;
    Some((lower + upper) / 2.0)
}

/// Width of the mask's foreground in pixels.
pub fn pixel_width(mask: &Mask, mode: WidthMode) -> Option<f64> {
    match mode {
        WidthMode::AxisAligned => axis_aligned_width(mask),
        WidthMode::PrincipalAxis => principal_axis_width(mask),
    }
}

fn axis_aligned_width(mask: &Mask) -> Option<f64> {
    let (min_x, max_x) = mask
        .foreground()
        .fold(None, |bounds: Option<(usize, usize)>, (x, _)| match bounds {
            Some((min_x, max_x)) => Some((min_x.min(x), max_x.max(x))),
            None => Some((x, x)),
        })?;

    Some((max_x - min_x) as f64)
}

/// Extent along the major axis of the pixel covariance.
fn principal_axis_width(mask: &Mask) -> Option<f64> {
    let count = mask.foreground_count();
    if count == 0 {
        return None;
    }

    let (sum_x, sum_y) = mask
        .foreground()
        .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x as f64, sy + y as f64));
    let (mean_x, mean_y) = (sum_x / count as f64, sum_y / count as f64);

    let (cxx, cyy, cxy) = mask.foreground().fold((0.0, 0.0, 0.0), |(cxx, cyy, cxy), (x, y)| {
        let (dx, dy) = (x as f64 - mean_x, y as f64 - mean_y);
        (cxx + dx * dx, cyy + dy * dy, cxy + dx * dy)
    });

    let theta = 0.5 * (2.0 * cxy).atan2(cxx - cyy);
    let (cos, sin) = (theta.cos(), theta.sin());

    let (min, max) = mask
        .foreground()
        .map(|(x, y)| x as f64 * cos + y as f64 * sin)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), projected| {
            (min.min(projected), max.max(projected))
        });

    Some(max - min)
}

/// Turns pothole and ring depth populations into metric measurements.
#[derive(Debug, Clone, Copy)]
pub struct MetricEstimator {
    camera: PinholeCamera,
    width_mode: WidthMode,
}

impl MetricEstimator {
    pub fn new(camera: PinholeCamera, width_mode: WidthMode) -> Self {
        Self { camera, width_mode }
    }

    pub fn camera(&self) -> &PinholeCamera {
        &self.camera
    }

    /// Returns `None` when either depth population is empty.
    pub fn estimate(
        &self,
        pothole_id: usize,
        pothole_mask: &Mask,
        pothole_depths: &mut [f32],
        ring_depths: &mut [f32],
    ) -> Option<PotholeMeasurement> {
        let road_surface_m = median(ring_depths)?;
        let pothole_floor_m = median(pothole_depths)?;

        let raw_depth_cm = (pothole_floor_m - road_surface_m) * 100.0;
        let pixel_width = pixel_width(pothole_mask, self.width_mode)?;
        let width_cm = self.camera.project_span(pixel_width, road_surface_m) * 100.0;

        Some(PotholeMeasurement {
            pothole_id,
            distance_m: road_surface_m,
            depth_cm: raw_depth_cm.max(0.0),
            width_cm,
            raw_depth_cm,
        })
    }
}
