use anyhow::{ensure, Result};

/// Rectilinear pinhole camera without lens distortion, described only by its
/// focal length in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeCamera {
    focal_length_px: f64,
}

impl PinholeCamera {
    /// Derives the focal length from a horizontal field of view and the
    /// width of the image the field of view spans.
    ///
    /// Args:
    ///    horizontal_fov_deg (f64): Horizontal field of view, in degrees, within (0, 180).
    ///    image_width (usize): Width in pixels of the depth map.
    ///
    /// Returns:
    ///    PinholeCamera with `focal_length_px = (W / 2) / tan(fov / 2)`.
    pub fn from_horizontal_fov(horizontal_fov_deg: f64, image_width: usize) -> Result<Self> {
        ensure!(image_width > 0, "Image width must be positive");
        ensure!(
            horizontal_fov_deg.is_finite() && horizontal_fov_deg > 0.0 && horizontal_fov_deg < 180.0,
            "Horizontal field of view must lie in (0, 180) degrees, got {}",
            horizontal_fov_deg
        );

        let half_fov = (horizontal_fov_deg / 2.0).to_radians();
        Ok(Self {
            focal_length_px: (image_width as f64 / 2.0) / half_fov.tan(),
        })
    }

    pub fn focal_length_px(&self) -> f64 {
        self.focal_length_px
    }

    /// Physical span, in meters, of `pixel_span` pixels seen at `distance_m`.
    pub fn project_span(&self, pixel_span: f64, distance_m: f64) -> f64 {
        pixel_span * distance_m / self.focal_length_px
    }
}
