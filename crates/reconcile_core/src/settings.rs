use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileSettings {
    /// Minimum overlap for a direction to be considered in agreement.
    pub ok_threshold: f64,
    /// Below this the direction is reported as a mismatch instead of a
    /// candidate for review.
    pub investigate_threshold: f64,
    pub stop_distance_tolerance_m: f64,
    /// Replaces the per-route and per-mode tolerance when set.
    pub tolerance_override_m: Option<f64>,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            ok_threshold: 0.95,
            investigate_threshold: 0.5,
            stop_distance_tolerance_m: 50.0,
            tolerance_override_m: None,
        }
    }
}

impl ReconcileSettings {
    pub fn grade(&self, score: f64) -> OverlapGrade {
        if score >= self.ok_threshold {
            OverlapGrade::Ok
        } else if score >= self.investigate_threshold {
            OverlapGrade::Investigate
        } else {
            OverlapGrade::Mismatch
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapGrade {
    Ok,
    Investigate,
    Mismatch,
}

impl OverlapGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverlapGrade::Ok => "ok",
            OverlapGrade::Investigate => "investigate",
            OverlapGrade::Mismatch => "mismatch",
        }
    }
}
