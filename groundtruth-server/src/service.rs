use crate::config::ServerConfig;
use anyhow::Result;
use groundtruth_geometry::{PotholeAnalyzer, PotholeReport};
use groundtruth_inference::{
    DepthAnythingSession, DepthEstimation, PotholeSegmentation, YoloSegmentSession,
};
use image::RgbImage;
use log::{debug, info};
use std::sync::Arc;
use std::time::Instant;

/// Everything one analysis request needs. Built once at startup; the model
/// handles are read-only and shared by every worker.
pub struct PotholeService {
    segmentation: Arc<dyn PotholeSegmentation>,
    depth: Arc<dyn DepthEstimation>,
    analyzer: PotholeAnalyzer,
}

impl PotholeService {
    pub fn new(
        segmentation: Arc<dyn PotholeSegmentation>,
        depth: Arc<dyn DepthEstimation>,
        analyzer: PotholeAnalyzer,
    ) -> Self {
        Self {
            segmentation,
            depth,
            analyzer,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let analyzer = PotholeAnalyzer::new(config.geometry)?;
        let model = &config.model;

        let segmentation = YoloSegmentSession::new(
            model.segmentation_path(),
            model.execution_provider,
            model.intra_threads,
            model.segmentation,
        )?;
        let depth = DepthAnythingSession::new(
            model.depth_path(),
            model.execution_provider,
            model.intra_threads,
            model.depth,
        )?;
        info!("Pothole models ready");

        Ok(Self::new(Arc::new(segmentation), Arc::new(depth), analyzer))
    }

    /// Segments, estimates depth and measures every pothole in `image`.
    pub fn analyze_image(&self, image: &RgbImage) -> Result<PotholeReport> {
        let start = Instant::now();

        let masks = self.segmentation.segment_potholes(image)?;
        debug!("Segmentation found {} masks in {:?}", masks.len(), start.elapsed());
        if masks.is_empty() {
            return Ok(PotholeReport::default());
        }

        let depth = self.depth.estimate_depth(image)?;
        debug!(
            "Depth map {}x{} ready after {:?}",
            depth.width(),
            depth.height(),
            start.elapsed()
        );

        let report = self.analyzer.analyze(&depth, &masks)?;
        info!(
            "Analyzed {}x{} image in {:?}: {} potholes",
            image.width(),
            image.height(),
            start.elapsed(),
            report.count()
        );

        Ok(report)
    }
}
