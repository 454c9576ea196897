//! Rolling combat record per emplacement and the SELL/UPGRADE rules built on it

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::config::PerformanceConfig;
use crate::core::types::{Cycle, EmplacementId};
use crate::decision::candidate::{ActionKind, CandidateAction, UpgradePath};
use crate::spatial::field::ScalarField;
use crate::spatial::grid::Grid;
use crate::world::snapshot::EmplacementSnapshot;

/// Combat outcome reported by the simulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CombatEvent {
    ShotFired {
        emplacement: EmplacementId,
        hit: bool,
        damage: f32,
    },
    Kill {
        emplacement: EmplacementId,
    },
}

impl CombatEvent {
    pub fn emplacement(&self) -> EmplacementId {
        match *self {
            CombatEvent::ShotFired { emplacement, .. } | CombatEvent::Kill { emplacement } => emplacement,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub kills: u32,
    pub shots_fired: u64,
    pub shots_hit: u64,
    pub damage_dealt: f32,
    /// Cycles the emplacement has been observed on the board
    pub active_cycles: u64,
    pub first_seen: Cycle,
}

impl PerformanceRecord {
    pub fn accuracy(&self) -> f32 {
        if self.shots_fired == 0 {
            0.0
        } else {
            self.shots_hit as f32 / self.shots_fired as f32
        }
    }

    pub fn damage_per_cycle(&self) -> f32 {
        if self.active_cycles == 0 {
            0.0
        } else {
            self.damage_dealt / self.active_cycles as f32
        }
    }
}

/// Performance bookkeeping across the match
#[derive(Debug, Clone)]
pub struct PerformanceTracker {
    config: PerformanceConfig,
    records: AHashMap<EmplacementId, PerformanceRecord>,
}

impl PerformanceTracker {
    pub fn new(config: &PerformanceConfig) -> Self {
        Self {
            config: config.clone(),
            records: AHashMap::new(),
        }
    }

    pub fn record(&self, id: EmplacementId) -> Option<&PerformanceRecord> {
        self.records.get(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fold one combat event into the owning emplacement's record
    pub fn apply(&mut self, event: &CombatEvent) {
        let record = self.records.entry(event.emplacement()).or_default();
        match *event {
            CombatEvent::ShotFired { hit, damage, .. } => {
                record.shots_fired += 1;
                if hit {
                    record.shots_hit += 1;
                }
                if damage.is_finite() && damage > 0.0 {
                    record.damage_dealt += damage;
                }
            }
            CombatEvent::Kill { .. } => record.kills += 1,
        }
    }

    /// Count a cycle of presence for every emplacement on the board and forget sold ones
    pub fn observe_cycle(&mut self, cycle: Cycle, emplacements: &[EmplacementSnapshot]) {
        self.records
            .retain(|id, _| emplacements.iter().any(|e| e.id == *id));
        for emplacement in emplacements {
            let record = self.records.entry(emplacement.id).or_insert_with(|| PerformanceRecord {
                first_seen: cycle,
                ..PerformanceRecord::default()
            });
            record.active_cycles += 1;
        }
    }

    /// Observed long enough with nothing to show for it
    pub fn is_idle(&self, id: EmplacementId) -> bool {
        self.records.get(&id).is_some_and(|r| {
            r.active_cycles >= self.config.observation_window
                && r.kills == 0
                && (r.damage_dealt <= 0.0 || r.damage_per_cycle() < self.config.min_damage_per_cycle)
        })
    }

    /// SELL and UPGRADE candidates for this cycle
    ///
    /// `best_placement` is the strongest PLACE candidate available; a SELL is
    /// only proposed when that alternative beats the idle emplacement's site
    /// and becomes affordable with the refund.
    pub fn propose(
        &self,
        grid: &Grid,
        traffic: &ScalarField,
        emplacements: &[EmplacementSnapshot],
        best_placement: Option<&CandidateAction>,
        resources: i64,
    ) -> Vec<CandidateAction> {
        let mut proposals = Vec::new();

        for emplacement in emplacements {
            if !self.is_idle(emplacement.id) {
                continue;
            }
            let site = traffic_share(grid, traffic, emplacement);
            let Some(alternative) = best_placement else {
                continue;
            };
            let better = alternative.score > site;
            let affordable = alternative.cost <= resources.saturating_add(emplacement.sell_value);
            if better && affordable && matches!(alternative.action, ActionKind::Place { .. }) {
                debug!(
                    emplacement = %emplacement.id,
                    site,
                    alternative = alternative.score,
                    "idle emplacement, proposing sale"
                );
                proposals.push(CandidateAction::sell(
                    emplacement.id,
                    0.5 + 0.5 * (alternative.score - site),
                ));
            }
        }

        if let Some(upgrade) = self.best_upgrade(grid, traffic, emplacements, resources) {
            proposals.push(upgrade);
        }
        proposals
    }

    fn best_upgrade(
        &self,
        grid: &Grid,
        traffic: &ScalarField,
        emplacements: &[EmplacementSnapshot],
        resources: i64,
    ) -> Option<CandidateAction> {
        let (emplacement, record) = emplacements
            .iter()
            .filter_map(|e| self.records.get(&e.id).map(|r| (e, r)))
            .filter(|(e, r)| r.damage_dealt > 0.0 && e.upgrade_cost.is_some_and(|c| c <= resources))
            .max_by(|a, b| {
                a.1.damage_per_cycle()
                    .total_cmp(&b.1.damage_per_cycle())
                    .then(b.0.id.cmp(&a.0.id))
            })?;

        let cost = emplacement.upgrade_cost?;
        let share = traffic_share(grid, traffic, emplacement);
        let accuracy = record.accuracy();
        let path = if share < self.config.low_range_traffic {
            UpgradePath::Range
        } else if accuracy >= self.config.high_accuracy {
            UpgradePath::Damage
        } else {
            UpgradePath::Rate
        };
        trace!(emplacement = %emplacement.id, ?path, share, accuracy, "upgrade candidate");

        Some(CandidateAction::upgrade(
            emplacement.id,
            path,
            0.3 + 0.5 * accuracy + 0.2 * share,
            cost,
        ))
    }
}

/// Traffic within an emplacement's range, relative to one path crossing its diameter
pub fn traffic_share(grid: &Grid, traffic: &ScalarField, emplacement: &EmplacementSnapshot) -> f32 {
    let sum: f32 = grid
        .cells_within(emplacement.position, emplacement.range)
        .into_iter()
        .map(|c| traffic.at(c))
        .sum();
    let diameter_cells = (2.0 * emplacement.range / grid.cell_size).max(1.0);
    (sum / diameter_cells).clamp(0.0, 1.0)
}
