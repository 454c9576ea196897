//! Behavior Predictor
//!
//! Per-archetype trajectory forecasts and the archetype x emplacement
//! effectiveness matrix used to pick counters.

pub mod archetype;
pub mod effectiveness;
pub mod predictor;

pub use archetype::Archetype;
pub use effectiveness::{default_effectiveness_rows, EffectivenessEntry, EffectivenessMatrix};
pub use predictor::{ArchetypeCensus, BehaviorPredictor, PredictionContext};
