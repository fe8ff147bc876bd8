use crate::camera::PinholeCamera;
use crate::config::GeometryConfig;
use crate::depth::DepthMap;
use crate::estimator::MetricEstimator;
use crate::mask::Mask;
use crate::measurement::{PotholeMeasurement, PotholeReport};
use crate::ring::road_ring;
use anyhow::Result;
use log::{debug, info};
use rayon::prelude::*;

/// Measures every detected pothole of one image against its depth map.
///
/// Holds no per-request state, so one analyzer can serve any number of
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct PotholeAnalyzer {
    config: GeometryConfig,
}

impl PotholeAnalyzer {
    pub fn new(config: GeometryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GeometryConfig {
        &self.config
    }

    /// Runs alignment, ring extraction and metric estimation for each mask.
    ///
    /// Args:
    ///    depth (DepthMap): Metric depth of the image, in meters.
    ///    masks (&[Mask]): Detector masks in detector order, at any resolution.
    ///
    /// Returns:
    ///    PotholeReport: One measurement per usable mask, keeping mask order.
    ///    Masks with an empty pothole or ring population are skipped silently.
    pub fn analyze(&self, depth: &DepthMap, masks: &[Mask]) -> Result<PotholeReport> {
        let camera = PinholeCamera::from_horizontal_fov(self.config.horizontal_fov_deg, depth.width())?;
        let estimator = MetricEstimator::new(camera, self.config.width_mode);
        debug!(
            "Analyzing {} masks on {}x{} depth map, focal length {:.2}px",
            masks.len(),
            depth.width(),
            depth.height(),
            camera.focal_length_px()
        );

        let measured = masks
            .par_iter()
            .enumerate()
            .map(|(pothole_id, mask)| self.measure(pothole_id, mask, depth, &estimator))
            .collect::<Result<Vec<_>>>()?;

        let skipped = measured.iter().filter(|measurement| measurement.is_none()).count();
        let measurements = measured.into_iter().flatten().collect::<Vec<_>>();
        let report = PotholeReport::new(measurements, skipped);

        info!(
            "Measured {} potholes ({} skipped, {} depth clamped)",
            report.count(),
            report.skipped(),
            report.clamped_count()
        );

        Ok(report)
    }

    fn measure(
        &self,
        pothole_id: usize,
        mask: &Mask,
        depth: &DepthMap,
        estimator: &MetricEstimator,
    ) -> Result<Option<PotholeMeasurement>> {
        let aligned = mask.resize_nearest(depth.width(), depth.height());
        let ring = road_ring(&aligned, &self.config)?;

        let mut pothole_depths = depth.sample(&aligned)?;
        let mut ring_depths = depth.sample(&ring)?;
        if pothole_depths.is_empty() || ring_depths.is_empty() {
            debug!(
                "Skipping pothole {}: {} pothole samples, {} ring samples",
                pothole_id,
                pothole_depths.len(),
                ring_depths.len()
            );
            return Ok(None);
        }

        let measurement = estimator.estimate(pothole_id, &aligned, &mut pothole_depths, &mut ring_depths);
        if let Some(measurement) = &measurement {
            if measurement.is_depth_clamped() {
                debug!(
                    "Pothole {} floor reads {:.2}cm above the road, clamped to zero",
                    pothole_id, -measurement.raw_depth_cm
                );
            }
        }

        Ok(measurement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_config() {
        let config = GeometryConfig {
            ring_iterations: 0,
            ..Default::default()
        };
        assert!(PotholeAnalyzer::new(config).is_err());
    }

    #[test]
    fn low_resolution_mask_is_aligned() -> Result<()> {
        let depth = DepthMap::from_shape_vec(80, 80, vec![3.0; 80 * 80])?;
        // 20x20 mask covering the middle, 4x smaller than the depth map
        let mask = Mask::from_fn(20, 20, |x, y| (8..12).contains(&x) && (8..12).contains(&y));

        let report = PotholeAnalyzer::new(GeometryConfig::default())?.analyze(&depth, &[mask])?;
        assert_eq!(report.count(), 1);

        let measurement = report.measurements()[0];
        assert_eq!(measurement.distance_m, 3.0);
        assert_eq!(measurement.depth_cm, 0.0);
        assert!(!measurement.is_depth_clamped());
        // aligned region spans x 32..=47
        let camera = PinholeCamera::from_horizontal_fov(65.0, 80)?;
        assert!((measurement.width_cm - camera.project_span(15.0, 3.0) * 100.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn nan_ring_counts_as_empty() -> Result<()> {
        let mask = Mask::from_fn(30, 30, |x, y| (10..20).contains(&x) && (10..20).contains(&y));
        let values = (0..30 * 30)
            .map(|index| if mask[index] { 2.5 } else { f32::NAN })
            .collect();
        let depth = DepthMap::from_shape_vec(30, 30, values)?;

        let report = PotholeAnalyzer::new(GeometryConfig::default())?.analyze(&depth, &[mask])?;
        assert!(report.is_empty());
        assert_eq!(report.skipped(), 1);
        Ok(())
    }
}
