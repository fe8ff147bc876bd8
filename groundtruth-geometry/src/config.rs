use crate::{HORIZONTAL_FOV_DEG, RING_ITERATIONS, RING_KERNEL_SIZE};
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// How the physical width of a pothole is measured from its mask.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidthMode {
    /// Horizontal bounding extent, `x_max - x_min`.
    #[default]
    AxisAligned,
    /// Extent along the major principal axis of the foreground pixels.
    /// Closer to the true length of elongated diagonal potholes.
    PrincipalAxis,
}

/// Fixed constants the geometry depends on, supplied once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub horizontal_fov_deg: f64,
    pub ring_kernel_size: usize,
    pub ring_iterations: usize,
    pub width_mode: WidthMode,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            horizontal_fov_deg: HORIZONTAL_FOV_DEG,
            ring_kernel_size: RING_KERNEL_SIZE,
            ring_iterations: RING_ITERATIONS,
            width_mode: WidthMode::default(),
        }
    }
}

impl GeometryConfig {
    pub fn with_width_mode(mut self, width_mode: WidthMode) -> Self {
        self.width_mode = width_mode;
        self
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.horizontal_fov_deg.is_finite()
                && self.horizontal_fov_deg > 0.0
                && self.horizontal_fov_deg < 180.0,
            "Horizontal field of view must lie in (0, 180) degrees, got {}",
            self.horizontal_fov_deg
        );
        ensure!(
            self.ring_kernel_size > 0,
            "Ring structuring element size must be positive"
        );
        ensure!(
            self.ring_iterations > 0,
            "Ring dilation iteration count must be positive"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = GeometryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ring_kernel_size, 15);
        assert_eq!(config.ring_iterations, 2);
        assert_eq!(config.width_mode, WidthMode::AxisAligned);
    }

    #[test]
    fn rejects_degenerate_fov() {
        for fov in [0.0, 180.0, -10.0, f64::NAN] {
            let config = GeometryConfig {
                horizontal_fov_deg: fov,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "fov {fov} should be rejected");
        }
    }

    #[test]
    fn rejects_empty_ring_settings() {
        let config = GeometryConfig {
            ring_kernel_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GeometryConfig {
            ring_iterations: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: GeometryConfig =
            serde_json::from_str(r#"{"horizontal_fov_deg": 70.0, "width_mode": "principal_axis"}"#)
                .unwrap();
        assert_eq!(config.horizontal_fov_deg, 70.0);
        assert_eq!(config.ring_kernel_size, 15);
        assert_eq!(config.width_mode, WidthMode::PrincipalAxis);
    }
}
