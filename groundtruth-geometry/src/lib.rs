pub mod analysis;
pub mod camera;
pub mod config;
pub mod depth;
pub mod estimator;
pub mod mask;
pub mod measurement;
pub mod ring;

pub use analysis::PotholeAnalyzer;
pub use camera::PinholeCamera;
pub use config::{GeometryConfig, WidthMode};
pub use depth::DepthMap;
pub use mask::Mask;
pub use measurement::{AnalysisResponse, PotholeMeasurement, PotholeRecord, PotholeReport};

/// Horizontal field of view of the capture camera, in degrees.
pub const HORIZONTAL_FOV_DEG: f64 = 65.0;

// --- Road ring constants ---
// Both assume potholes span tens of pixels at depth-map resolution.
// A 15px square applied twice grows the mask by 14px on every side.
/// Side length of the square structuring element used to grow the road ring.
pub const RING_KERNEL_SIZE: usize = 15;
/// Number of dilation passes used to grow the road ring.
pub const RING_ITERATIONS: usize = 2;

/// Depth above which a pothole counts as deep when pricing a hazard report.
pub const DEEP_POTHOLE_THRESHOLD_CM: f64 = 5.0;
