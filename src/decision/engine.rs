//! Utility Decision Engine
//!
//! Turns the cycle's candidates into exactly one selection:
//!
//! 1. stale SELL/UPGRADE references are dropped silently
//! 2. SELL of a recently placed or upgraded emplacement is held back
//! 3. unaffordable candidates are dropped
//! 4. raw scores are blended with curve-shaped global signals; placements
//!    also weigh how close they sit to the objective
//! 5. crisis promotion and wave-phase bias adjust buckets
//! 6. candidates under the commit threshold are dropped
//! 7. the highest non-empty bucket wins; inertia only reorders inside it
//!
//! When nothing survives the result is a synthesized WAIT.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::config::DecisionConfig;
use crate::core::types::{CellCoord, Cycle, Vec2};
use crate::decision::candidate::{clamp_unit, ActionKind, CandidateAction, PriorityBucket, Provenance};
use crate::decision::curves::{coverage_gap, distance_value, health_urgency, threat_response};
use crate::decision::memory::DecisionMemory;
use crate::spatial::grid::Grid;
use crate::world::snapshot::{EmplacementSnapshot, WaveInfo, WorldSnapshot};

/// Share of a placement's signal taken by its distance value
const DISTANCE_SHARE: f32 = 0.25;

/// Raw global signals for one cycle, each in [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Signals {
    /// Objective health fraction
    pub objective_health: f32,
    /// Strongest threat anywhere on the map
    pub threat: f32,
    /// Share of traffic not covered by existing emplacements
    pub coverage_gap: f32,
    /// Spare resources relative to the cheapest placement
    pub economy: f32,
}

/// Signals after their scoring curves
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalScores {
    pub health_urgency: f32,
    pub threat: f32,
    pub coverage_gap: f32,
    pub economy: f32,
}

/// Everything besides the candidates that selection depends on
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    pub cycle: Cycle,
    pub grid: &'a Grid,
    pub objective: Vec2,
    pub emplacements: &'a [EmplacementSnapshot],
    pub wave: WaveInfo,
    pub signals: Signals,
}

impl<'a> SelectionContext<'a> {
    pub fn from_snapshot(snapshot: &'a WorldSnapshot, signals: Signals) -> Self {
        Self {
            cycle: snapshot.cycle,
            grid: &snapshot.grid,
            objective: snapshot.objective,
            emplacements: &snapshot.emplacements,
            wave: snapshot.wave,
            signals,
        }
    }

    fn emplacement(&self, action: &ActionKind) -> Option<&'a EmplacementSnapshot> {
        let id = action.referenced_emplacement()?;
        self.emplacements.iter().find(|e| e.id == id)
    }
}

/// Outcome of one selection pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    pub chosen: CandidateAction,
    /// Survivors, best first (bucket, then utility)
    pub ranked: Vec<CandidateAction>,
    pub scores: SignalScores,
    pub dropped_stale: usize,
    pub dropped_cooldown: usize,
    pub dropped_unaffordable: usize,
    pub dropped_below_commit: usize,
    /// Whether health urgency crossed the crisis threshold
    pub crisis: bool,
}

impl Selection {
    pub fn is_wait(&self) -> bool {
        self.chosen.is_wait()
    }
}

/// Buckets, scores and picks one candidate per cycle
#[derive(Debug, Clone)]
pub struct UtilityEngine {
    config: DecisionConfig,
}

impl UtilityEngine {
    pub fn new(config: &DecisionConfig) -> Self {
        Self { config: config.clone() }
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    /// Pass each raw signal through its configured curve
    pub fn score_signals(&self, signals: &Signals) -> SignalScores {
        let curves = &self.config.curves;
        SignalScores {
            health_urgency: health_urgency(&curves.health_urgency, clamp_unit(signals.objective_health)),
            threat: threat_response(&curves.threat_response, signals.threat),
            coverage_gap: coverage_gap(&curves.coverage_gap, signals.coverage_gap),
            economy: clamp_unit(signals.economy),
        }
    }

    /// Choose one action; never fails, worst case is WAIT
    pub fn select_action(
        &self,
        candidates: &[CandidateAction],
        memory: &DecisionMemory,
        resources: i64,
        ctx: &SelectionContext,
    ) -> Selection {
        let scores = self.score_signals(&ctx.signals);
        let crisis = scores.health_urgency >= self.config.crisis_urgency;

        let mut dropped_stale = 0;
        let mut dropped_cooldown = 0;
        let mut dropped_unaffordable = 0;
        let mut dropped_below_commit = 0;
        let mut survivors: Vec<CandidateAction> = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            if candidate.is_wait() {
                continue;
            }

            let referenced = ctx.emplacement(&candidate.action);
            if candidate.action.referenced_emplacement().is_some() && referenced.is_none() {
                trace!(action = ?candidate.action, "stale emplacement reference dropped");
                dropped_stale += 1;
                continue;
            }

            if let (ActionKind::Sell { id }, Some(emplacement)) = (candidate.action, referenced) {
                let cell = ctx.grid.world_to_cell(emplacement.position);
                if memory.blocks_sell(id, cell, ctx.cycle, self.config.sell_cooldown) {
                    dropped_cooldown += 1;
                    continue;
                }
            }

            if !candidate.is_affordable(resources) {
                dropped_unaffordable += 1;
                continue;
            }

            let mut scored = self.apply_signals(candidate.clone(), &scores, ctx);
            if crisis && is_defensive(&scored) {
                scored.bucket = PriorityBucket::Crisis;
            }
            self.apply_phase_bias(&mut scored, &ctx.wave);

            if scored.utility < self.config.min_commit {
                dropped_below_commit += 1;
                continue;
            }
            survivors.push(scored);
        }

        let last_target = memory.last_target();
        for candidate in survivors.iter_mut() {
            if last_target.is_some() && candidate.action.target() == last_target {
                candidate.breakdown.inertia = self.config.inertia_bonus;
            }
        }

        survivors.sort_by(|a, b| {
            b.bucket
                .cmp(&a.bucket)
                .then_with(|| OrderedFloat(effective(b)).cmp(&OrderedFloat(effective(a))))
                .then_with(|| OrderedFloat(b.score).cmp(&OrderedFloat(a.score)))
        });

        let chosen = survivors.first().cloned().unwrap_or_else(CandidateAction::wait);

        debug!(
            cycle = ctx.cycle,
            action = chosen.action.label(),
            bucket = ?chosen.bucket,
            utility = chosen.utility,
            survivors = survivors.len(),
            stale = dropped_stale,
            unaffordable = dropped_unaffordable,
            "selection"
        );

        Selection {
            chosen,
            ranked: survivors,
            scores,
            dropped_stale,
            dropped_cooldown,
            dropped_unaffordable,
            dropped_below_commit,
            crisis,
        }
    }

    /// Closeness of a cell to the objective through the distance curve
    pub fn distance_value(&self, cell: CellCoord, ctx: &SelectionContext) -> f32 {
        let distance = ctx.grid.cell_center(cell).distance(&ctx.objective);
        if !distance.is_finite() {
            return 0.0;
        }
        distance_value(&self.config.curves.distance_value, distance, ctx.grid.diagonal())
    }

    fn apply_signals(&self, mut candidate: CandidateAction, scores: &SignalScores, ctx: &SelectionContext) -> CandidateAction {
        let signal = match candidate.action {
            ActionKind::Place { cell, .. } => {
                let pressure = match candidate.source {
                    Provenance::CoverageGap => scores.coverage_gap,
                    _ => scores
                        .health_urgency
                        .max((scores.threat + scores.coverage_gap) * 0.5),
                };
                let proximity = self.distance_value(cell, ctx);
                candidate.breakdown.distance = proximity;
                (1.0 - DISTANCE_SHARE) * pressure + DISTANCE_SHARE * proximity
            }
            // selling under pressure is a poor trade
            ActionKind::Sell { .. } => scores.economy * (1.0 - scores.health_urgency),
            ActionKind::Upgrade { .. } => scores.economy.max(scores.threat * 0.5),
            ActionKind::Wait => 0.0,
        };
        let w = self.config.signal_weight;
        candidate.breakdown.signal = signal;
        candidate.utility = clamp_unit((1.0 - w) * candidate.score + w * signal);
        candidate
    }

    fn apply_phase_bias(&self, candidate: &mut CandidateAction, wave: &WaveInfo) {
        if candidate.bucket != PriorityBucket::Defense {
            return;
        }
        if wave.boss_imminent {
            candidate.utility = clamp_unit(candidate.utility * self.config.boss_defense_multiplier);
        } else if wave.number < self.config.early_wave_cutoff && candidate.utility < self.config.early_defense_floor {
            candidate.bucket = PriorityBucket::Opportunistic;
        }
    }
}

fn is_defensive(candidate: &CandidateAction) -> bool {
    matches!(candidate.action, ActionKind::Place { .. }) && candidate.bucket == PriorityBucket::Defense
}

fn effective(candidate: &CandidateAction) -> f32 {
    candidate.utility + candidate.breakdown.inertia
}
