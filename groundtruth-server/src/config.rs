use anyhow::{Context, Result};
use groundtruth_geometry::GeometryConfig;
use groundtruth_inference::{DepthAnythingOptions, ExecutionProvider, YoloSegmentOptions};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Actix worker count; one per core when unset.
    pub workers: Option<usize>,
    pub max_payload_bytes: usize,
    pub model: ModelConfig,
    pub geometry: GeometryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub folder: PathBuf,
    pub segmentation_file: String,
    pub depth_file: String,
    pub execution_provider: ExecutionProvider,
    pub intra_threads: usize,
    pub segmentation: YoloSegmentOptions,
    pub depth: DepthAnythingOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            workers: None,
            max_payload_bytes: 16 * 1024 * 1024,
            model: ModelConfig::default(),
            geometry: GeometryConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("./data/model"),
            segmentation_file: "pothole_seg.onnx".to_string(),
            depth_file: "depth_anything_v2_metric.onnx".to_string(),
            execution_provider: ExecutionProvider::default(),
            intra_threads: 4,
            segmentation: YoloSegmentOptions::default(),
            depth: DepthAnythingOptions::default(),
        }
    }
}

impl ModelConfig {
    pub fn segmentation_path(&self) -> PathBuf {
        self.folder.join(&self.segmentation_file)
    }

    pub fn depth_path(&self) -> PathBuf {
        self.folder.join(&self.depth_file)
    }
}

impl ServerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: ServerConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}
