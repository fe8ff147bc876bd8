use crate::DEEP_POTHOLE_THRESHOLD_CM;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Metric size of one detected pothole, at full precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PotholeMeasurement {
    /// Index of the source mask in the detector's output.
    pub pothole_id: usize,
    /// Median depth of the surrounding road ring, in meters.
    pub distance_m: f64,
    /// Depth of the pothole floor below the road, in centimeters. Never negative.
    pub depth_cm: f64,
    pub width_cm: f64,
    /// Floor minus road before clamping. Negative values mean the floor read
    /// nearer than the road, usually a mask or depth error.
    pub raw_depth_cm: f64,
}

impl PotholeMeasurement {
    pub fn is_depth_clamped(&self) -> bool {
        self.raw_depth_cm < 0.0
    }

    pub fn to_record(&self) -> PotholeRecord {
        PotholeRecord {
            pothole_id: self.pothole_id,
            distance_m: round2(self.distance_m),
            depth_cm: round2(self.depth_cm),
            width_cm: round2(self.width_cm),
        }
    }
}

impl Display for PotholeMeasurement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pothole {}: distance {:.2} m, depth {:.2} cm, width {:.2} cm",
            self.pothole_id, self.distance_m, self.depth_cm, self.width_cm
        )
    }
}

/// Presentation form of a measurement, rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotholeRecord {
    pub pothole_id: usize,
    pub distance_m: f64,
    pub depth_cm: f64,
    pub width_cm: f64,
}

/// Body returned to callers of the analysis endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub pothole_count: usize,
    pub results: Vec<PotholeRecord>,
    /// Any reported depth above [`DEEP_POTHOLE_THRESHOLD_CM`].
    #[serde(default)]
    pub has_deep_pothole: bool,
}

/// All measurements of one image, in mask order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PotholeReport {
    measurements: Vec<PotholeMeasurement>,
    skipped: usize,
}

impl PotholeReport {
    pub(crate) fn new(measurements: Vec<PotholeMeasurement>, skipped: usize) -> Self {
        Self {
            measurements,
            skipped,
        }
    }

    pub fn measurements(&self) -> &[PotholeMeasurement] {
        &self.measurements
    }

    pub fn count(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Masks that produced no measurement because the pothole or its ring was empty.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn clamped_count(&self) -> usize {
        self.measurements
            .iter()
            .filter(|measurement| measurement.is_depth_clamped())
            .count()
    }

    pub fn records(&self) -> Vec<PotholeRecord> {
        self.measurements.iter().map(PotholeMeasurement::to_record).collect()
    }

    /// Whether any reported depth exceeds `threshold_cm`.
    /// Compares the rounded values a client would see.
    pub fn has_deep_pothole(&self, threshold_cm: f64) -> bool {
        self.records()
            .iter()
            .any(|record| record.depth_cm > threshold_cm)
    }

    pub fn to_response(&self) -> AnalysisResponse {
        AnalysisResponse {
            pothole_count: self.count(),
            results: self.records(),
            has_deep_pothole: self.has_deep_pothole(DEEP_POTHOLE_THRESHOLD_CM),
        }
    }
}

/// Ties go to the even hundredth, so `0.125` becomes `0.12`.
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
