//! Attenuation curves and field normalisation

use serde::{Deserialize, Serialize};

use crate::spatial::field::ScalarField;

/// How a source's contribution shrinks with distance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Falloff {
    Linear,
    Quadratic,
    Exponential,
}

const EXPONENTIAL_RATE: f32 = 3.0;

impl Falloff {
    /// Attenuation at normalised distance `t` (0 at the source, 1 at the radius)
    ///
    /// Every curve maps 0 to 1 and 1 to 0.
    pub fn attenuate(&self, t: f32) -> f32 {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 1.0 };
        match self {
            Falloff::Linear => 1.0 - t,
            Falloff::Quadratic => (1.0 - t) * (1.0 - t),
            Falloff::Exponential => {
                let floor = (-EXPONENTIAL_RATE).exp();
                ((-EXPONENTIAL_RATE * t).exp() - floor) / (1.0 - floor)
            }
        }
    }
}

/// How a summed field is brought back into [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Divide by the largest value
    MaxValue,
    /// Divide by the given percentile of the non-zero values, then clamp
    Percentile(f32),
}

impl Normalization {
    /// Normalise in place; returns the reference value used (0.0 for an empty field)
    pub fn apply(&self, field: &mut ScalarField) -> f32 {
        field.sanitize();
        let reference = match *self {
            Normalization::MaxValue => field.max(),
            Normalization::Percentile(p) => percentile_of_nonzero(field.values(), p),
        };

        let values = field.values_mut();
        if !(reference > 0.0) || !reference.is_finite() {
            values.iter_mut().for_each(|v| *v = 0.0);
            return 0.0;
        }
        for v in values.iter_mut() {
            *v = (*v / reference).clamp(0.0, 1.0);
        }
        reference
    }
}

fn percentile_of_nonzero(values: &[f32], p: f32) -> f32 {
    let mut nonzero: Vec<f32> = values.iter().copied().filter(|v| *v > 0.0).collect();
    if nonzero.is_empty() {
        return 0.0;
    }
    nonzero.sort_by(|a, b| a.total_cmp(b));
    let p = if p.is_finite() { p.clamp(0.0, 1.0) } else { 1.0 };
    let rank = ((nonzero.len() - 1) as f32 * p).round() as usize;
    nonzero[rank.min(nonzero.len() - 1)]
}
