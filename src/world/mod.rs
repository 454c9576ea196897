//! Observed world state supplied by the host each cycle

pub mod snapshot;

pub use snapshot::{CostTable, EmplacementSnapshot, EnemySnapshot, WaveInfo, WorldSnapshot};
