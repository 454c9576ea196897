//! Strategic agent: runs one full decision cycle per control interval
//!
//! Each cycle: traffic and influence fields are rebuilt from the snapshot,
//! the interceptor, gap finder and performance tracker propose candidates,
//! the utility engine picks one, and the humanizer decides when it goes out.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::agent::executor::{ActionExecutor, AiSwitch, ExecutionOutcome};
use crate::agent::reasoning::{top_candidates, CycleDiagnostic, ReasoningSnapshot};
use crate::behavior::archetype::Archetype;
use crate::behavior::predictor::{BehaviorPredictor, PredictionContext};
use crate::core::config::AgentConfig;
use crate::core::error::Result;
use crate::core::types::{CellCoord, Cycle, Vec2};
use crate::decision::candidate::{ActionKind, CandidateAction};
use crate::decision::engine::{SelectionContext, Signals, UtilityEngine};
use crate::decision::memory::DecisionMemory;
use crate::humanize::adjuster::DifficultyAdjuster;
use crate::humanize::filter::{DelayedAction, Humanizer};
use crate::humanize::profile::DifficultyProfile;
use crate::influence::map::{build_map, coverage_sources, threat_magnitude, threat_sources};
use crate::influence::peaks::find_local_maxima;
use crate::intercept::interceptor::{candidate_types, CounterBias, InterceptInputs, PathInterceptor};
use crate::intercept::validity::{PlacementRules, PlacementValidator};
use crate::performance::tracker::{CombatEvent, PerformanceTracker};
use crate::spatial::field::ScalarField;
use crate::spatial::grid::Grid;
use crate::traffic::density::compute_traffic_density;
use crate::traffic::flow_field::FlowFieldView;
use crate::world::snapshot::{EnemySnapshot, WorldSnapshot};

/// Ranked candidates kept in the reasoning export before bucket leaders
const REASONING_TOP: usize = 8;

/// Result of one evaluated host tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle: Cycle,
    pub issued: Option<DelayedAction>,
    pub outcome: Option<ExecutionOutcome>,
}

/// The autonomous defender
#[derive(Debug)]
pub struct StrategicAgent {
    config: AgentConfig,
    predictor: BehaviorPredictor,
    interceptor: PathInterceptor,
    engine: UtilityEngine,
    memory: DecisionMemory,
    tracker: PerformanceTracker,
    humanizer: Humanizer,
    adjuster: DifficultyAdjuster,
    profile: DifficultyProfile,
    /// Action waiting out its reaction delay
    pending: Option<DelayedAction>,
    switch: AiSwitch,
    last_evaluation_tick: Option<u64>,
    reasoning: Option<ReasoningSnapshot>,
}

impl StrategicAgent {
    /// Build an agent; fails fast on invalid config or an incomplete effectiveness matrix
    pub fn new(config: AgentConfig) -> Result<Self> {
        config.validate()?;
        let seed = config.cycle.seed;
        Ok(Self {
            predictor: BehaviorPredictor::new(&config.behavior, seed)?,
            interceptor: PathInterceptor::new(&config.intercept),
            engine: UtilityEngine::new(&config.decision),
            memory: DecisionMemory::new(config.decision.memory_size),
            tracker: PerformanceTracker::new(&config.performance),
            humanizer: Humanizer::new(seed.wrapping_add(1)),
            adjuster: DifficultyAdjuster::new(&config.humanize.adjuster, &config.humanize.bounds),
            profile: config.humanize.bounds.clamp(&config.humanize.profile),
            pending: None,
            switch: AiSwitch::default(),
            last_evaluation_tick: None,
            reasoning: None,
            config,
        })
    }

    /// Replace the difficulty profile (clamped to the configured bounds)
    pub fn with_profile(mut self, profile: DifficultyProfile) -> Self {
        self.profile = self.config.humanize.bounds.clamp(&profile);
        self
    }

    /// Share an externally owned on/off switch
    pub fn with_switch(mut self, switch: AiSwitch) -> Self {
        self.switch = switch;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn switch(&self) -> AiSwitch {
        self.switch.clone()
    }

    pub fn profile(&self) -> &DifficultyProfile {
        &self.profile
    }

    pub fn memory(&self) -> &DecisionMemory {
        &self.memory
    }

    pub fn tracker(&self) -> &PerformanceTracker {
        &self.tracker
    }

    pub fn predictor(&self) -> &BehaviorPredictor {
        &self.predictor
    }

    pub fn pending(&self) -> Option<&DelayedAction> {
        self.pending.as_ref()
    }

    /// Reasoning behind the most recent cycle
    pub fn reasoning(&self) -> Option<&ReasoningSnapshot> {
        self.reasoning.as_ref()
    }

    /// Feed combat events from the simulation into the performance tracker
    pub fn observe_combat(&mut self, events: &[CombatEvent]) {
        for event in events {
            self.tracker.apply(event);
        }
    }

    /// Should we re-evaluate this tick?
    fn should_evaluate(&self, tick: u64) -> bool {
        match self.last_evaluation_tick {
            None => true,
            Some(last) => tick >= last + self.config.cycle.interval,
        }
    }

    /// Host-loop entry: runs a cycle every `cycle.interval` ticks and hands
    /// the issued action, if any, to the executor
    pub fn process_tick(
        &mut self,
        tick: u64,
        snapshot: &WorldSnapshot,
        executor: &mut dyn ActionExecutor,
    ) -> Option<CycleReport> {
        if !self.should_evaluate(tick) {
            return None;
        }
        self.last_evaluation_tick = Some(tick);

        let issued = self.decide(snapshot);
        let outcome = match &issued {
            Some(delayed) => {
                let outcome = executor.execute(delayed.action());
                self.report_outcome(delayed, &outcome);
                Some(outcome)
            }
            None => None,
        };

        Some(CycleReport {
            cycle: snapshot.cycle,
            issued,
            outcome,
        })
    }

    /// Record what the executor made of an issued action
    pub fn report_outcome(&mut self, issued: &DelayedAction, outcome: &ExecutionOutcome) {
        match outcome {
            ExecutionOutcome::Success { emplacement } => {
                debug!(action = issued.action().label(), ?emplacement, "action executed");
            }
            ExecutionOutcome::Failed { reason } => {
                warn!(action = issued.action().label(), reason = %reason, "action rejected by executor");
                if let Some(reasoning) = self.reasoning.as_mut() {
                    reasoning.diagnostics.push(CycleDiagnostic::ExecutionFailed { reason: reason.clone() });
                }
            }
        }
    }

    /// One decision cycle; returns the action to issue now, if any
    ///
    /// Never fails: malformed input is clamped or skipped and recorded as a
    /// diagnostic, and the worst case is WAIT.
    pub fn decide(&mut self, snapshot: &WorldSnapshot) -> Option<DelayedAction> {
        let started = Instant::now();
        let now = snapshot.cycle;
        let grid = snapshot.grid;
        let mut diagnostics = Vec::new();

        let health = if snapshot.objective_health.is_finite() {
            snapshot.objective_health.clamp(0.0, 1.0)
        } else {
            diagnostics.push(CycleDiagnostic::NonFiniteInput {
                what: "objective_health".into(),
                count: 1,
            });
            1.0
        };
        self.tracker.observe_cycle(now, &snapshot.emplacements);
        self.adjuster.record(health);
        self.profile = self.adjuster.adjust(&self.profile);

        let enemies: Vec<EnemySnapshot> = snapshot
            .enemies
            .iter()
            .filter(|e| e.position.is_finite())
            .cloned()
            .collect();
        if enemies.len() < snapshot.enemies.len() {
            let count = snapshot.enemies.len() - enemies.len();
            warn!(count, "enemies with non-finite positions skipped");
            diagnostics.push(CycleDiagnostic::NonFiniteInput {
                what: "enemy_position".into(),
                count,
            });
        }

        // traffic
        let flow = FlowFieldView::new(&grid, &snapshot.flow);
        if !flow.is_complete() {
            diagnostics.push(CycleDiagnostic::FlowFieldUndersized {
                expected: grid.cell_count(),
                actual: snapshot.flow.len(),
            });
        }
        let origins = if snapshot.spawn_cells.is_empty() {
            flow.boundary_origins()
        } else {
            snapshot.spawn_cells.clone()
        };
        let objective_index = grid
            .world_to_cell_checked(snapshot.objective)
            .and_then(|cell| grid.index(cell));
        let traffic = compute_traffic_density(&flow, &origins, objective_index, &self.config.traffic);
        if traffic.abandoned > 0 {
            diagnostics.push(CycleDiagnostic::TracesAbandoned { count: traffic.abandoned });
        }
        if traffic.skipped > 0 {
            diagnostics.push(CycleDiagnostic::OriginsSkipped { count: traffic.skipped });
        }

        // behaviour and influence
        self.predictor.observe(&enemies);
        let ctx = PredictionContext {
            objective: snapshot.objective,
            emplacements: &snapshot.emplacements,
        };
        let horizon = self.config.influence.prediction_horizon;
        let mut predictions = Vec::with_capacity(enemies.len());
        for enemy in &enemies {
            predictions.push(self.predictor.predict_trajectory(enemy, horizon, &ctx));
        }
        let threat = build_map(
            &grid,
            &threat_sources(&grid, &enemies, &predictions, snapshot.objective, &self.config),
            &self.config.influence.threat,
        );
        let coverage = build_map(
            &grid,
            &coverage_sources(&snapshot.emplacements, &self.config),
            &self.config.influence.coverage,
        );

        let separation = self.config.influence.peak_separation;
        let hot_spots = find_local_maxima(&threat, &grid, separation);
        let reach = self.config.behavior.counter_radius as f32 * grid.cell_size;
        let spot_archetypes: Vec<(Vec2, Archetype)> = hot_spots
            .iter()
            .filter_map(|cell| {
                let center = grid.cell_center(*cell);
                BehaviorPredictor::dominant_near(&enemies, center, reach).map(|a| (center, a))
            })
            .collect();
        let counter = CounterBias::new(
            self.predictor.matrix(),
            spot_archetypes,
            self.predictor.census().dominant(),
            reach,
        );

        // candidates
        let types = candidate_types(&self.config, &snapshot.costs);
        let rules = PlacementRules::from_snapshot(snapshot)
            .with_safe_zone(snapshot.objective, self.config.intercept.safe_zone_radius);
        let inputs = InterceptInputs {
            flow,
            traffic: &traffic.field,
            threat: &threat,
            coverage: &coverage,
            objective: snapshot.objective,
        };
        let mut candidates = self.interceptor.propose_placements(&inputs, &types, &rules, &counter);
        let taken: Vec<CellCoord> = candidates
            .iter()
            .filter_map(|c| match c.action {
                ActionKind::Place { cell, .. } => Some(cell),
                _ => None,
            })
            .collect();
        let gaps = self
            .interceptor
            .propose_gap_fills(&inputs, &types, &rules, &counter, separation, &taken);
        let best_placement = candidates.first().cloned();
        candidates.extend(gaps);
        candidates.extend(self.tracker.propose(
            &grid,
            &traffic.field,
            &snapshot.emplacements,
            best_placement.as_ref(),
            snapshot.resources,
        ));

        // selection
        let signals = Signals {
            objective_health: health,
            threat: threat_pressure(&enemies, snapshot.objective, &grid),
            coverage_gap: uncovered_share(&traffic.field, &coverage),
            economy: economic_headroom(snapshot.resources, snapshot.costs.cheapest()),
        };
        let selection = self.engine.select_action(
            &candidates,
            &self.memory,
            snapshot.resources,
            &SelectionContext::from_snapshot(snapshot, signals),
        );
        self.memory.record(now, selection.chosen.action, selection.chosen.bucket);
        if selection.dropped_stale + selection.dropped_unaffordable > 0 {
            diagnostics.push(CycleDiagnostic::CandidatesDropped {
                stale: selection.dropped_stale,
                unaffordable: selection.dropped_unaffordable,
            });
        }

        let issued = self.release(snapshot, &selection.chosen, &rules, &mut diagnostics);

        let elapsed = started.elapsed();
        let budget_us = self.config.cycle.budget_ms * 1000;
        let elapsed_us = elapsed.as_micros() as u64;
        if elapsed_us > budget_us {
            warn!(cycle = now, elapsed_us, budget_us, "decision cycle over budget");
            diagnostics.push(CycleDiagnostic::BudgetExceeded { elapsed_us, budget_us });
        }

        debug!(
            cycle = now,
            chosen = selection.chosen.action.label(),
            bucket = ?selection.chosen.bucket,
            utility = selection.chosen.utility,
            issued = issued.as_ref().map(|d| d.action().label()),
            candidates = candidates.len(),
            "cycle complete"
        );

        self.reasoning = Some(ReasoningSnapshot {
            cycle: now,
            threat,
            coverage,
            traffic: traffic.field,
            hot_spots,
            scores: selection.scores,
            top_candidates: top_candidates(&selection.ranked, REASONING_TOP),
            chosen: selection.chosen,
            issued: issued.clone(),
            diagnostics,
        });

        issued
    }

    /// Route the selection through the humanizer and the pending slot
    fn release(
        &mut self,
        snapshot: &WorldSnapshot,
        chosen: &CandidateAction,
        rules: &PlacementRules,
        diagnostics: &mut Vec<CycleDiagnostic>,
    ) -> Option<DelayedAction> {
        let now = snapshot.cycle;
        if !self.switch.is_enabled() {
            diagnostics.push(CycleDiagnostic::Disabled);
            return None;
        }

        if let Some(pending) = self.pending.take() {
            if !pending.is_due(now) {
                self.pending = Some(pending);
                return None;
            }
            return match revalidate(&pending, snapshot, rules) {
                Ok(()) => Some(pending),
                Err(reason) => {
                    debug!(action = pending.action().label(), reason = %reason, "pending action dropped");
                    diagnostics.push(CycleDiagnostic::PendingDropped { reason });
                    Some(DelayedAction::immediate(CandidateAction::wait(), now))
                }
            };
        }

        match self.humanizer.filter(chosen.clone(), &self.profile, now, rules) {
            None => {
                diagnostics.push(CycleDiagnostic::AttentionLapse);
                None
            }
            Some(delayed) if delayed.is_due(now) => Some(delayed),
            Some(delayed) => {
                self.pending = Some(delayed);
                None
            }
        }
    }
}

/// A delayed action must still make sense when its time comes
fn revalidate(pending: &DelayedAction, snapshot: &WorldSnapshot, rules: &PlacementRules) -> std::result::Result<(), String> {
    let candidate = &pending.candidate;
    if let Some(id) = candidate.action.referenced_emplacement() {
        if !snapshot.has_emplacement(id) {
            return Err(format!("emplacement {} no longer exists", id));
        }
    }
    if !candidate.is_affordable(snapshot.resources) {
        return Err(format!("cost {} exceeds resources {}", candidate.cost, snapshot.resources));
    }
    if let ActionKind::Place { kind, cell } = candidate.action {
        if !rules.is_valid_placement(cell, kind) {
            return Err(format!("cell ({}, {}) no longer valid", cell.x, cell.y));
        }
    }
    Ok(())
}

/// Aggregate enemy threat squashed into [0, 1)
fn threat_pressure(enemies: &[EnemySnapshot], objective: Vec2, grid: &Grid) -> f32 {
    let reach = grid.diagonal();
    let total: f32 = enemies.iter().map(|e| threat_magnitude(e, objective, reach)).sum();
    1.0 - (-total).exp()
}

/// Traffic-weighted share of paths not yet covered
fn uncovered_share(traffic: &ScalarField, coverage: &ScalarField) -> f32 {
    let mut total = 0.0f32;
    let mut uncovered = 0.0f32;
    for (i, t) in traffic.values().iter().enumerate() {
        total += t;
        uncovered += t * (1.0 - coverage.get(i));
    }
    if total > 0.0 {
        (uncovered / total).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Spare resources relative to the cheapest placement
fn economic_headroom(resources: i64, cheapest: Option<i64>) -> f32 {
    match cheapest {
        Some(cost) if resources > 0 && cost > 0 => resources as f32 / (resources + cost) as f32,
        Some(_) if resources > 0 => 1.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{EmplacementId, EmplacementKind};
    use crate::traffic::flow_field::FlowFieldSample;
    use crate::world::snapshot::{CostTable, EmplacementSnapshot, WaveInfo};

    /// 12x5 board, enemies enter on the west edge and walk east along row 2
    fn corridor(resources: i64) -> WorldSnapshot {
        let grid = Grid::new(12, 5, 1.0).unwrap();
        let mut flow = vec![FlowFieldSample::blocked(); grid.cell_count()];
        for x in 0..12 {
            let i = grid.index(CellCoord::new(x, 2)).unwrap();
            flow[i] = FlowFieldSample::new(Vec2::new(1.0, 0.0), 1.0);
        }
        let objective = Vec2::new(11.5, 2.5);
        let goal = grid.index(CellCoord::new(11, 2)).unwrap();
        flow[goal] = FlowFieldSample::new(Vec2::ZERO, 1.0);
        WorldSnapshot {
            cycle: 1,
            grid,
            flow,
            objective,
            objective_health: 1.0,
            enemies: vec![EnemySnapshot::new(
                Vec2::new(1.5, 2.5),
                Vec2::new(1.0, 0.0),
                Archetype::Direct,
                1.0,
            )],
            emplacements: Vec::new(),
            resources,
            costs: CostTable::new().with(EmplacementKind::Gatling, 50).with(EmplacementKind::Cannon, 90),
            wave: WaveInfo {
                number: 5,
                boss_imminent: false,
            },
            spawn_cells: vec![grid.index(CellCoord::new(0, 2)).unwrap()],
            blocked_cells: Vec::new(),
        }
    }

    fn agent() -> StrategicAgent {
        StrategicAgent::new(AgentConfig::default())
            .unwrap()
            .with_profile(DifficultyProfile::flawless())
    }

    #[test]
    fn test_first_action_places_on_corridor() {
        let mut agent = agent();
        let issued = agent.decide(&corridor(500)).expect("flawless agent issues immediately");
        match issued.action() {
            ActionKind::Place { cell, .. } => assert_eq!(cell.y, 2),
            other => panic!("expected placement, got {:?}", other),
        }
    }

    #[test]
    fn test_broke_agent_waits() {
        let mut agent = agent();
        let issued = agent.decide(&corridor(10)).unwrap();
        assert!(issued.action().is_wait());
    }

    #[test]
    fn test_disabled_agent_withholds() {
        let mut agent = agent();
        let switch = agent.switch();
        switch.disable();
        assert!(agent.decide(&corridor(500)).is_none());
        let reasoning = agent.reasoning().unwrap();
        assert!(!reasoning.chosen.is_wait(), "the cycle still computes");
        assert!(reasoning.has_diagnostic(|d| *d == CycleDiagnostic::Disabled));
    }

    #[test]
    fn test_delayed_action_waits_in_slot() {
        let profile = DifficultyProfile {
            reaction_delay: 2.0,
            ..DifficultyProfile::flawless()
        };
        let mut agent = StrategicAgent::new(AgentConfig::default()).unwrap().with_profile(profile);
        let mut snapshot = corridor(500);
        assert!(agent.decide(&snapshot).is_none());
        assert!(agent.pending().is_some());
        snapshot.cycle = 2;
        assert!(agent.decide(&snapshot).is_none());
        snapshot.cycle = 3;
        let issued = agent.decide(&snapshot).expect("due on cycle 3");
        assert!(matches!(issued.action(), ActionKind::Place { .. }));
        assert!(agent.pending().is_none());
    }

    #[test]
    fn test_stale_pending_becomes_wait() {
        let profile = DifficultyProfile {
            reaction_delay: 1.0,
            ..DifficultyProfile::flawless()
        };
        let mut agent = StrategicAgent::new(AgentConfig::default()).unwrap().with_profile(profile);
        let mut snapshot = corridor(500);
        assert!(agent.decide(&snapshot).is_none());
        snapshot.cycle = 2;
        snapshot.resources = 0;
        let issued = agent.decide(&snapshot).unwrap();
        assert!(issued.action().is_wait());
        assert!(agent
            .reasoning()
            .unwrap()
            .has_diagnostic(|d| matches!(d, CycleDiagnostic::PendingDropped { .. })));
    }

    #[test]
    fn test_process_tick_respects_interval() {
        let mut agent = agent();
        let snapshot = corridor(500);
        let mut issued = Vec::new();
        let mut exec = |action: &ActionKind| {
            issued.push(*action);
            ExecutionOutcome::ok()
        };
        for tick in 0..31 {
            agent.process_tick(tick, &snapshot, &mut exec);
        }
        // ticks 0, 15 and 30
        assert_eq!(issued.len(), 3);
    }

    #[test]
    fn test_undersized_flow_is_diagnosed_not_fatal() {
        let mut agent = agent();
        let mut snapshot = corridor(500);
        snapshot.flow.truncate(7);
        assert!(agent.decide(&snapshot).is_some());
        assert!(agent
            .reasoning()
            .unwrap()
            .has_diagnostic(|d| matches!(d, CycleDiagnostic::FlowFieldUndersized { .. })));
    }

    #[test]
    fn test_rejected_action_is_recorded() {
        let mut agent = agent();
        let snapshot = corridor(500);
        let mut refuse = |_: &ActionKind| ExecutionOutcome::failed("occupied");
        let report = agent.process_tick(0, &snapshot, &mut refuse).unwrap();
        assert_eq!(report.outcome, Some(ExecutionOutcome::failed("occupied")));
        assert!(agent
            .reasoning()
            .unwrap()
            .has_diagnostic(|d| matches!(d, CycleDiagnostic::ExecutionFailed { .. })));
    }

    #[test]
    fn test_combat_events_reach_tracker() {
        let mut agent = agent();
        let mut snapshot = corridor(500);
        snapshot.emplacements.push(EmplacementSnapshot::new(
            EmplacementId::new(3),
            EmplacementKind::Gatling,
            Vec2::new(5.5, 1.5),
            3.0,
        ));
        agent.decide(&snapshot);
        agent.observe_combat(&[CombatEvent::Kill {
            emplacement: EmplacementId::new(3),
        }]);
        assert_eq!(agent.tracker().record(EmplacementId::new(3)).unwrap().kills, 1);
    }

    #[test]
    fn test_economic_headroom() {
        assert_eq!(economic_headroom(0, Some(50)), 0.0);
        assert_eq!(economic_headroom(50, Some(50)), 0.5);
        assert_eq!(economic_headroom(50, None), 0.0);
    }
}
