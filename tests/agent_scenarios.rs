//! End-to-end behaviour of the strategic agent on small scripted boards

mod common;

use common::{corridor, CORRIDOR_ROW};
use siegeward::agent::{CycleDiagnostic, ExecutionOutcome, StrategicAgent};
use siegeward::behavior::Archetype;
use siegeward::core::config::AgentConfig;
use siegeward::core::types::{CellCoord, EmplacementId, EmplacementKind, Vec2};
use siegeward::decision::candidate::{ActionKind, PriorityBucket};
use siegeward::humanize::{load_difficulty_profile, DifficultyProfile};
use siegeward::performance::CombatEvent;
use siegeward::world::{EmplacementSnapshot, EnemySnapshot, WaveInfo};

fn flawless_agent() -> StrategicAgent {
    StrategicAgent::new(AgentConfig::default())
        .unwrap()
        .with_profile(DifficultyProfile::flawless())
}

#[test]
fn test_first_action_on_empty_board_intercepts_corridor() {
    let mut agent = flawless_agent();
    let mut snapshot = corridor(500);

    let mut first = None;
    for cycle in 1..=10 {
        snapshot.cycle = cycle;
        if let Some(issued) = agent.decide(&snapshot) {
            if !issued.action().is_wait() {
                first = Some(*issued.action());
                break;
            }
        }
    }

    match first {
        Some(ActionKind::Place { cell, .. }) => assert_eq!(cell.y, CORRIDOR_ROW),
        other => panic!("expected a placement on the corridor, got {:?}", other),
    }
}

#[test]
fn test_idle_emplacement_is_eventually_sold() {
    let mut agent = flawless_agent();
    let mut snapshot = corridor(30);
    // Far from the corridor: range 1 around row 0 never sees traffic
    let mut idle = EmplacementSnapshot::new(EmplacementId::new(9), EmplacementKind::Gatling, Vec2::new(5.5, 0.5), 1.0);
    idle.sell_value = 100;
    snapshot.emplacements.push(idle);

    let window = agent.config().performance.observation_window;
    let mut sold_at = None;
    for cycle in 1..=window + 5 {
        snapshot.cycle = cycle;
        let issued = agent.decide(&snapshot).expect("flawless agent always issues");
        if let ActionKind::Sell { id } = issued.action() {
            assert_eq!(*id, EmplacementId::new(9));
            sold_at = Some(cycle);
            break;
        }
        assert!(issued.action().is_wait(), "nothing else is affordable");
    }

    let cycle = sold_at.expect("idle emplacement should be sold");
    assert!(cycle >= window, "judged only after the observation window");
}

#[test]
fn test_broke_agent_always_waits() {
    let profile = load_difficulty_profile("standard").unwrap();
    let mut agent = StrategicAgent::new(AgentConfig::default()).unwrap().with_profile(profile);
    let mut snapshot = corridor(49);
    snapshot.wave = WaveInfo {
        number: 9,
        boss_imminent: true,
    };

    for cycle in 1..=30 {
        snapshot.cycle = cycle;
        snapshot.objective_health = 1.0 - cycle as f32 / 40.0;
        snapshot.enemies.push(EnemySnapshot::new(
            Vec2::new(1.0 + (cycle % 12) as f32, CORRIDOR_ROW as f32 + 0.5),
            Vec2::new(1.5, 0.0),
            Archetype::ALL[cycle as usize % 5],
            1.0,
        ));
        let issued = agent.decide(&snapshot).expect("WAIT is never withheld");
        assert!(issued.action().is_wait(), "cycle {} issued {:?}", cycle, issued.action());
    }
}

#[test]
fn test_boss_wave_keeps_defense_ahead_of_upgrades() {
    let mut agent = flawless_agent();
    let mut snapshot = corridor(500);
    snapshot.wave = WaveInfo {
        number: 1,
        boss_imminent: true,
    };
    let mut sharp = EmplacementSnapshot::new(EmplacementId::new(4), EmplacementKind::Cannon, Vec2::new(3.5, 3.5), 1.5);
    sharp.upgrade_cost = Some(40);
    snapshot.emplacements.push(sharp);

    // Seed a perfect record so the upgrade scores near the top
    agent.decide(&snapshot);
    let hits: Vec<CombatEvent> = (0..10)
        .map(|_| CombatEvent::ShotFired {
            emplacement: EmplacementId::new(4),
            hit: true,
            damage: 5.0,
        })
        .collect();
    agent.observe_combat(&hits);

    snapshot.cycle = 2;
    agent.decide(&snapshot);
    let reasoning = agent.reasoning().unwrap();
    assert_eq!(reasoning.chosen.bucket, PriorityBucket::Defense);
    assert!(matches!(reasoning.chosen.action, ActionKind::Place { .. }));

    // the upgrade outscored the placement on its own merits and lost on bucket
    let upgrade = reasoning
        .top_candidates
        .iter()
        .find(|c| matches!(c.action, ActionKind::Upgrade { .. }))
        .expect("upgrade survives selection");
    assert_eq!(upgrade.bucket, PriorityBucket::Economy);
    assert!(
        upgrade.score > reasoning.chosen.score,
        "upgrade {} vs placement {}",
        upgrade.score,
        reasoning.chosen.score
    );
}

#[test]
fn test_jittered_placement_stays_out_of_safe_zone() {
    let mut snapshot = corridor(500);
    let grid = snapshot.grid;
    // only the three columns next to the objective are buildable
    snapshot.blocked_cells = (0..grid.cell_count())
        .filter(|&i| grid.coord(i).is_some_and(|c| c.x < 13))
        .collect();
    let profile = DifficultyProfile {
        placement_error_radius: 2.5,
        ..DifficultyProfile::flawless()
    };

    let mut placed = 0;
    for seed in 0..100 {
        let mut config = AgentConfig::default();
        config.cycle.seed = seed;
        let safe_zone = config.intercept.safe_zone_radius;
        let mut agent = StrategicAgent::new(config).unwrap().with_profile(profile.clone());
        let Some(issued) = agent.decide(&snapshot) else {
            continue;
        };
        if let ActionKind::Place { cell, .. } = issued.action() {
            placed += 1;
            assert!(cell.x >= 13, "seed {} placed on blocked cell {:?}", seed, cell);
            let distance = grid.cell_center(*cell).distance(&snapshot.objective);
            assert!(distance >= safe_zone, "seed {} placed {:?} inside the safe zone", seed, cell);
            assert_ne!(*cell, CellCoord::new(15, CORRIDOR_ROW));
        }
    }
    assert!(placed > 0, "some seeds should still place");
}

#[test]
fn test_reasoning_export_is_consistent() {
    let mut agent = flawless_agent();
    let snapshot = corridor(500);
    agent.decide(&snapshot);
    let reasoning = agent.reasoning().unwrap();

    let cells = snapshot.grid.cell_count();
    assert_eq!(reasoning.threat.len(), cells);
    assert_eq!(reasoning.coverage.len(), cells);
    assert_eq!(reasoning.traffic.len(), cells);
    assert!(reasoning.traffic.is_normalized());
    assert!(!reasoning.hot_spots.is_empty());

    let json = reasoning.to_json().unwrap();
    assert!(json.contains("\"chosen\""));
}

#[test]
fn test_malformed_cycle_degrades_to_wait() {
    let mut agent = flawless_agent();
    let mut snapshot = corridor(500);
    snapshot.flow.clear();
    snapshot.objective_health = f32::NAN;
    snapshot.enemies.push(EnemySnapshot::new(
        Vec2::new(f32::NAN, 1.0),
        Vec2::ZERO,
        Archetype::Hunting,
        1.0,
    ));

    let issued = agent.decide(&snapshot).unwrap();
    assert!(issued.action().is_wait());
    let reasoning = agent.reasoning().unwrap();
    assert!(reasoning.has_diagnostic(|d| matches!(d, CycleDiagnostic::FlowFieldUndersized { .. })));
    assert!(reasoning.has_diagnostic(|d| matches!(d, CycleDiagnostic::NonFiniteInput { .. })));

    // the next, well-formed cycle is unaffected
    let mut healthy = corridor(500);
    healthy.cycle = 2;
    let issued = agent.decide(&healthy).unwrap();
    assert!(matches!(issued.action(), ActionKind::Place { .. }));
}

#[test]
fn test_host_loop_with_closure_executor() {
    let mut agent = flawless_agent();
    let snapshot = corridor(500);
    let mut log = Vec::new();
    let mut executor = |action: &ActionKind| {
        log.push(*action);
        ExecutionOutcome::ok()
    };

    let interval = agent.config().cycle.interval;
    let reports: Vec<_> = (0..interval * 4)
        .filter_map(|tick| agent.process_tick(tick, &snapshot, &mut executor))
        .collect();

    assert_eq!(reports.len(), 4);
    assert!(reports.iter().all(|r| r.outcome.as_ref().is_some_and(|o| o.is_success())));
    assert_eq!(log.len(), 4);
}
