//! Response curves mapping raw signals into [0, 1]

use serde::{Deserialize, Serialize};

/// A named response curve
///
/// Inputs are clamped to [0, 1] first; outputs always land in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "curve", rename_all = "snake_case")]
pub enum ScoringCurve {
    Linear,
    /// x squared; fed `1 - d / max` it gives quadratic distance falloff
    Quadratic,
    /// Convex growth: small inputs matter little, large inputs dominate
    Exponential { steepness: f32 },
    /// Smooth saturation around `midpoint`
    Logistic { midpoint: f32, steepness: f32 },
}

impl ScoringCurve {
    pub fn evaluate(&self, x: f32) -> f32 {
        let x = if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.0 };
        let y = match *self {
            ScoringCurve::Linear => x,
            ScoringCurve::Quadratic => x * x,
            ScoringCurve::Exponential { steepness } => {
                if steepness.abs() < 1e-4 {
                    x
                } else {
                    ((steepness * x).exp() - 1.0) / (steepness.exp() - 1.0)
                }
            }
            ScoringCurve::Logistic { midpoint, steepness } => {
                let raw = |v: f32| 1.0 / (1.0 + (-steepness * (v - midpoint)).exp());
                let (lo, hi) = (raw(0.0), raw(1.0));
                if (hi - lo).abs() < 1e-6 {
                    x
                } else {
                    (raw(x) - lo) / (hi - lo)
                }
            }
        };
        if y.is_finite() {
            y.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Urgency from objective health: low health gives disproportionately high urgency
pub fn health_urgency(curve: &ScoringCurve, health_fraction: f32) -> f32 {
    curve.evaluate(1.0 - health_fraction)
}

/// Value of a position from its distance to the objective (near = valuable)
pub fn distance_value(curve: &ScoringCurve, distance: f32, max_distance: f32) -> f32 {
    if !(max_distance > 0.0) {
        return 0.0;
    }
    curve.evaluate(1.0 - distance / max_distance)
}

/// Response to a threat magnitude in [0, 1]
pub fn threat_response(curve: &ScoringCurve, threat: f32) -> f32 {
    curve.evaluate(threat)
}

/// Pressure from an uncovered share of traffic in [0, 1]
pub fn coverage_gap(curve: &ScoringCurve, gap: f32) -> f32 {
    curve.evaluate(gap)
}
