//! Performance tracking for placed emplacements

pub mod tracker;

pub use tracker::{traffic_share, CombatEvent, PerformanceRecord, PerformanceTracker};
