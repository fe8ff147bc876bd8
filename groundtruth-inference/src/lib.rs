pub mod engine;
pub mod inference;
pub mod utils;

pub use engine::inference_engine::{ExecutionProvider, OnnxSession};
pub use inference::depth::depth_anything::{DepthAnythingOptions, DepthAnythingSession};
pub use inference::yolo::inference_yolo_seg::{YoloSegmentOptions, YoloSegmentSession};
pub use inference::{DepthEstimation, PotholeSegmentation};
