//! Per-cycle observations handed in by the host's collaborators
//!
//! Nothing here persists across cycles; the host rebuilds a `WorldSnapshot`
//! every time the agent thinks.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::behavior::archetype::Archetype;
use crate::core::types::{Cycle, EmplacementId, EmplacementKind, Vec2};
use crate::spatial::grid::Grid;
use crate::traffic::flow_field::FlowFieldSample;

/// One enemy as seen this cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    pub position: Vec2,
    /// World units per second
    pub velocity: Vec2,
    pub archetype: Archetype,
    /// Remaining health fraction (0.0 to 1.0)
    pub health: f32,
}

impl EnemySnapshot {
    pub fn new(position: Vec2, velocity: Vec2, archetype: Archetype, health: f32) -> Self {
        Self {
            position,
            velocity,
            archetype,
            health,
        }
    }
}

/// One existing emplacement as seen this cycle
///
/// Combat history is not part of the snapshot; the performance tracker keeps it by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmplacementSnapshot {
    pub id: EmplacementId,
    pub kind: EmplacementKind,
    pub position: Vec2,
    /// Effective range in world units
    pub range: f32,
    #[serde(default)]
    pub level: u8,
    /// Resources returned when sold
    #[serde(default)]
    pub sell_value: i64,
    /// Price of the next upgrade; `None` when fully upgraded
    #[serde(default)]
    pub upgrade_cost: Option<i64>,
}

impl EmplacementSnapshot {
    pub fn new(id: EmplacementId, kind: EmplacementKind, position: Vec2, range: f32) -> Self {
        Self {
            id,
            kind,
            position,
            range,
            level: 0,
            sell_value: 0,
            upgrade_cost: None,
        }
    }
}

/// Wave progression metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveInfo {
    pub number: u32,
    #[serde(default)]
    pub boss_imminent: bool,
}

/// Placement prices per emplacement kind, from the economy collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostTable {
    place: AHashMap<EmplacementKind, i64>,
}

impl CostTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: EmplacementKind, cost: i64) -> Self {
        self.place.insert(kind, cost);
        self
    }

    pub fn set(&mut self, kind: EmplacementKind, cost: i64) {
        self.place.insert(kind, cost);
    }

    /// Price of a kind; `None` when the kind is not on offer
    pub fn cost(&self, kind: EmplacementKind) -> Option<i64> {
        self.place.get(&kind).copied()
    }

    pub fn cheapest(&self) -> Option<i64> {
        self.place.values().copied().min()
    }

    /// Kinds on offer, in declaration order
    pub fn offered(&self) -> Vec<(EmplacementKind, i64)> {
        EmplacementKind::ALL
            .iter()
            .filter_map(|k| self.cost(*k).map(|c| (*k, c)))
            .collect()
    }
}

/// Everything the agent reads in one control cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub cycle: Cycle,
    pub grid: Grid,
    /// Flow field keyed by cell index
    pub flow: Vec<FlowFieldSample>,
    pub objective: Vec2,
    /// Objective health fraction (0.0 to 1.0)
    pub objective_health: f32,
    #[serde(default)]
    pub enemies: Vec<EnemySnapshot>,
    #[serde(default)]
    pub emplacements: Vec<EmplacementSnapshot>,
    pub resources: i64,
    pub costs: CostTable,
    #[serde(default)]
    pub wave: WaveInfo,
    /// Trace origins; the traversable boundary when empty
    #[serde(default)]
    pub spawn_cells: Vec<usize>,
    /// Cells where nothing may be built
    #[serde(default)]
    pub blocked_cells: Vec<usize>,
}

impl WorldSnapshot {
    pub fn emplacement(&self, id: EmplacementId) -> Option<&EmplacementSnapshot> {
        self.emplacements.iter().find(|e| e.id == id)
    }

    pub fn has_emplacement(&self, id: EmplacementId) -> bool {
        self.emplacement(id).is_some()
    }
}
