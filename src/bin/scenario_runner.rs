//! Headless Scenario Runner
//!
//! Plays the strategic agent against a scripted stream of waves on a small
//! serpentine board and prints a JSON (or text) summary.

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use siegeward::agent::{ActionExecutor, CycleDiagnostic, ExecutionOutcome, StrategicAgent};
use siegeward::behavior::{Archetype, EffectivenessMatrix};
use siegeward::core::config::{load_agent_config, AgentConfig};
use siegeward::core::types::{CellCoord, EmplacementId, EmplacementKind, Vec2};
use siegeward::decision::candidate::{ActionKind, UpgradePath};
use siegeward::humanize::{load_difficulty_profile, DifficultyProfile};
use siegeward::performance::CombatEvent;
use siegeward::spatial::Grid;
use siegeward::traffic::FlowFieldSample;
use siegeward::world::{CostTable, EmplacementSnapshot, EnemySnapshot, WaveInfo, WorldSnapshot};

/// Headless Scenario Runner - agent vs scripted waves
#[derive(Parser, Debug)]
#[command(name = "scenario_runner")]
#[command(about = "Run the defender agent against scripted waves and report the outcome")]
struct Args {
    /// Difficulty profile (loaded from data/difficulty/), or "flawless"
    #[arg(long, default_value = "standard")]
    profile: String,

    /// Agent config TOML; built-in defaults when omitted
    #[arg(long)]
    config: Option<String>,

    /// Number of waves to play
    #[arg(long, default_value_t = 8)]
    waves: u32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Print the final cycle's reasoning export
    #[arg(long)]
    reasoning: bool,
}

#[derive(Serialize, Default)]
struct ActionCounts {
    place: u32,
    sell: u32,
    upgrade: u32,
    wait: u32,
    rejected: u32,
    lapses: u32,
}

/// JSON output structure
#[derive(Serialize)]
struct ScenarioResult {
    outcome: String,
    waves_cleared: u32,
    ticks: u64,
    objective_health: f32,
    resources: i64,
    emplacements: usize,
    kills: u32,
    leaked: u32,
    actions: ActionCounts,
    profile: String,
    seed: u64,
}

const TICK_SECONDS: f32 = 1.0 / 60.0;
const TICKS_PER_WAVE: u64 = 900;
const FIRE_EVERY: u64 = 30;
const MAX_LEVEL: u8 = 3;
const LEAK_DAMAGE: f32 = 0.05;

struct Walker {
    progress: f32,
    archetype: Archetype,
    hp: f32,
    max_hp: f32,
    speed: f32,
}

struct Tower {
    id: EmplacementId,
    kind: EmplacementKind,
    cell: CellCoord,
    level: u8,
    range: f32,
    dps: f32,
    spent: i64,
}

/// Scripted world the agent defends
struct Arena {
    grid: Grid,
    path: Vec<CellCoord>,
    flow: Vec<FlowFieldSample>,
    costs: CostTable,
    config: AgentConfig,
    matrix: EffectivenessMatrix,
    rng: ChaCha8Rng,
    health: f32,
    resources: i64,
    walkers: Vec<Walker>,
    towers: Vec<Tower>,
    next_id: u32,
    wave: u32,
    to_spawn: u32,
    events: Vec<CombatEvent>,
    kills: u32,
    leaked: u32,
}

impl Arena {
    fn new(config: AgentConfig, seed: u64) -> siegeward::Result<Self> {
        let grid = Grid::new(20, 12, 1.0)?;
        let mut path = Vec::new();
        for x in 0..=16 {
            path.push(CellCoord::new(x, 2));
        }
        for y in 3..=9 {
            path.push(CellCoord::new(16, y));
        }
        for x in (4..=15).rev() {
            path.push(CellCoord::new(x, 9));
        }

        let mut flow = vec![FlowFieldSample::blocked(); grid.cell_count()];
        for (i, cell) in path.iter().enumerate() {
            let direction = match path.get(i + 1) {
                Some(next) => Vec2::new((next.x - cell.x) as f32, (next.y - cell.y) as f32),
                None => Vec2::ZERO,
            };
            if let Some(index) = grid.index(*cell) {
                flow[index] = FlowFieldSample::new(direction, 1.0);
            }
        }

        let costs = CostTable::new()
            .with(EmplacementKind::Gatling, 50)
            .with(EmplacementKind::Cannon, 90)
            .with(EmplacementKind::Frost, 60)
            .with(EmplacementKind::Laser, 120)
            .with(EmplacementKind::Missile, 110);

        Ok(Self {
            matrix: EffectivenessMatrix::from_entries(&config.behavior.effectiveness)?,
            grid,
            path,
            flow,
            costs,
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            health: 1.0,
            resources: 150,
            walkers: Vec::new(),
            towers: Vec::new(),
            next_id: 1,
            wave: 0,
            to_spawn: 0,
            events: Vec::new(),
            kills: 0,
            leaked: 0,
        })
    }

    fn objective(&self) -> Vec2 {
        self.path.last().map(|c| self.grid.cell_center(*c)).unwrap_or(Vec2::ZERO)
    }

    fn start_wave(&mut self, number: u32) {
        self.wave = number;
        self.to_spawn = 4 + 2 * number;
        if number > 1 {
            self.resources += 25;
        }
    }

    fn position_of(&self, walker: &Walker) -> (Vec2, Vec2) {
        let last = self.path.len().saturating_sub(1);
        let i = (walker.progress.floor() as usize).min(last);
        let j = (i + 1).min(last);
        let a = self.grid.cell_center(self.path[i]);
        let b = self.grid.cell_center(self.path[j]);
        let t = walker.progress - i as f32;
        let heading = (b - a).normalize();
        (a.lerp(&b, t), heading * walker.speed)
    }

    fn step(&mut self, tick: u64) {
        let spawn_gap = TICKS_PER_WAVE / (u64::from(self.to_spawn) + 4).max(1);
        if self.to_spawn > 0 && tick % spawn_gap.max(1) == 0 {
            let archetype = Archetype::ALL[self.rng.gen_range(0..Archetype::ALL.len())];
            let max_hp = 20.0 + 6.0 * self.wave as f32;
            self.walkers.push(Walker {
                progress: 0.0,
                archetype,
                hp: max_hp,
                max_hp,
                speed: 1.5,
            });
            self.to_spawn -= 1;
        }

        let end = (self.path.len() - 1) as f32;
        let before = self.walkers.len();
        for walker in &mut self.walkers {
            walker.progress += walker.speed * TICK_SECONDS;
        }
        self.walkers.retain(|w| w.progress < end);
        let leaked = (before - self.walkers.len()) as u32;
        self.leaked += leaked;
        self.health = (self.health - LEAK_DAMAGE * leaked as f32).max(0.0);

        if tick % FIRE_EVERY == 0 {
            self.fire();
        }
    }

    fn fire(&mut self) {
        let volley = FIRE_EVERY as f32 * TICK_SECONDS;
        for t in 0..self.towers.len() {
            let origin = self.grid.cell_center(self.towers[t].cell);
            let target = self
                .walkers
                .iter()
                .enumerate()
                .map(|(i, w)| (i, self.position_of(w).0.distance(&origin)))
                .filter(|(_, d)| *d <= self.towers[t].range)
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i);
            let Some(i) = target else { continue };

            let tower = &self.towers[t];
            let hit = self.rng.gen::<f32>() < 0.8;
            let damage = if hit {
                tower.dps * volley * self.matrix.multiplier(self.walkers[i].archetype, tower.kind)
            } else {
                0.0
            };
            self.events.push(CombatEvent::ShotFired {
                emplacement: tower.id,
                hit,
                damage,
            });
            let walker = &mut self.walkers[i];
            walker.hp -= damage;
            if walker.hp <= 0.0 {
                self.events.push(CombatEvent::Kill { emplacement: tower.id });
                self.walkers.swap_remove(i);
                self.kills += 1;
                self.resources += 10 + i64::from(self.wave);
            }
        }
    }

    fn upgrade_cost(&self, tower: &Tower) -> Option<i64> {
        if tower.level >= MAX_LEVEL {
            return None;
        }
        self.costs
            .cost(tower.kind)
            .map(|base| base * (i64::from(tower.level) + 1) * 3 / 4)
    }

    fn snapshot(&self, cycle: u64) -> WorldSnapshot {
        let enemies = self
            .walkers
            .iter()
            .map(|w| {
                let (position, velocity) = self.position_of(w);
                EnemySnapshot::new(position, velocity, w.archetype, w.hp / w.max_hp)
            })
            .collect();
        let emplacements = self
            .towers
            .iter()
            .map(|t| EmplacementSnapshot {
                level: t.level,
                sell_value: t.spent / 2,
                upgrade_cost: self.upgrade_cost(t),
                ..EmplacementSnapshot::new(t.id, t.kind, self.grid.cell_center(t.cell), t.range)
            })
            .collect();
        WorldSnapshot {
            cycle,
            grid: self.grid,
            flow: self.flow.clone(),
            objective: self.objective(),
            objective_health: self.health,
            enemies,
            emplacements,
            resources: self.resources,
            costs: self.costs.clone(),
            wave: WaveInfo {
                number: self.wave,
                boss_imminent: (self.wave + 1) % 5 == 0,
            },
            spawn_cells: self.path.first().and_then(|c| self.grid.index(*c)).into_iter().collect(),
            blocked_cells: Vec::new(),
        }
    }
}

impl ActionExecutor for Arena {
    fn execute(&mut self, action: &ActionKind) -> ExecutionOutcome {
        match *action {
            ActionKind::Wait => ExecutionOutcome::ok(),
            ActionKind::Place { kind, cell } => {
                if !self.grid.contains(cell) {
                    return ExecutionOutcome::failed("outside the board");
                }
                if self.towers.iter().any(|t| t.cell == cell) {
                    return ExecutionOutcome::failed("cell occupied");
                }
                let (Some(cost), Some(stats)) = (self.costs.cost(kind), self.config.stats(kind)) else {
                    return ExecutionOutcome::failed("kind not on offer");
                };
                if cost > self.resources {
                    return ExecutionOutcome::failed("insufficient resources");
                }
                self.resources -= cost;
                let id = EmplacementId::new(self.next_id);
                self.next_id += 1;
                self.towers.push(Tower {
                    id,
                    kind,
                    cell,
                    level: 0,
                    range: stats.range,
                    dps: stats.dps,
                    spent: cost,
                });
                ExecutionOutcome::Success { emplacement: Some(id) }
            }
            ActionKind::Sell { id } => match self.towers.iter().position(|t| t.id == id) {
                Some(i) => {
                    let tower = self.towers.swap_remove(i);
                    self.resources += tower.spent / 2;
                    ExecutionOutcome::ok()
                }
                None => ExecutionOutcome::failed("no such emplacement"),
            },
            ActionKind::Upgrade { id, path } => {
                let Some(i) = self.towers.iter().position(|t| t.id == id) else {
                    return ExecutionOutcome::failed("no such emplacement");
                };
                let Some(cost) = self.upgrade_cost(&self.towers[i]) else {
                    return ExecutionOutcome::failed("fully upgraded");
                };
                if cost > self.resources {
                    return ExecutionOutcome::failed("insufficient resources");
                }
                self.resources -= cost;
                let tower = &mut self.towers[i];
                tower.level += 1;
                tower.spent += cost;
                match path {
                    UpgradePath::Damage => tower.dps *= 1.25,
                    UpgradePath::Range => tower.range += 0.5,
                    UpgradePath::Rate => tower.dps *= 1.15,
                }
                ExecutionOutcome::ok()
            }
        }
    }
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("siegeward=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let seed = args.seed.unwrap_or_else(rand::random);

    let mut config = match &args.config {
        Some(path) => load_agent_config(path).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config '{}': {}", path, e);
            eprintln!("Using default config");
            AgentConfig::default()
        }),
        None => AgentConfig::default(),
    };
    config.cycle.seed = seed;

    let profile = if args.profile == "flawless" {
        DifficultyProfile::flawless()
    } else {
        load_difficulty_profile(&args.profile).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load profile '{}': {}", args.profile, e);
            eprintln!("Using standard profile");
            DifficultyProfile::default()
        })
    };

    let interval = config.cycle.interval;
    let mut agent = match StrategicAgent::new(config.clone()) {
        Ok(agent) => agent.with_profile(profile.clone()),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let mut arena = match Arena::new(config, seed.wrapping_add(7)) {
        Ok(arena) => arena,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let mut counts = ActionCounts::default();
    let mut waves_cleared = 0;
    let mut tick = 0u64;
    'waves: for wave in 1..=args.waves {
        arena.start_wave(wave);
        for _ in 0..TICKS_PER_WAVE {
            arena.step(tick);
            if arena.health <= 0.0 {
                break 'waves;
            }
            if tick % interval == 0 {
                let events = std::mem::take(&mut arena.events);
                agent.observe_combat(&events);
                let snapshot = arena.snapshot(tick / interval);
                if let Some(report) = agent.process_tick(tick, &snapshot, &mut arena) {
                    match (report.issued.as_ref().map(|d| d.action()), &report.outcome) {
                        (Some(_), Some(ExecutionOutcome::Failed { .. })) => counts.rejected += 1,
                        (Some(ActionKind::Place { .. }), _) => counts.place += 1,
                        (Some(ActionKind::Sell { .. }), _) => counts.sell += 1,
                        (Some(ActionKind::Upgrade { .. }), _) => counts.upgrade += 1,
                        (Some(ActionKind::Wait), _) | (None, _) => counts.wait += 1,
                    }
                    if agent
                        .reasoning()
                        .is_some_and(|r| r.has_diagnostic(|d| *d == CycleDiagnostic::AttentionLapse))
                    {
                        counts.lapses += 1;
                    }
                }
            }
            tick += 1;
        }
        waves_cleared = wave;
    }

    let result = ScenarioResult {
        outcome: if arena.health > 0.0 { "held".into() } else { "overrun".into() },
        waves_cleared,
        ticks: tick,
        objective_health: arena.health,
        resources: arena.resources,
        emplacements: arena.towers.len(),
        kills: arena.kills,
        leaked: arena.leaked,
        actions: counts,
        profile: profile.name.clone(),
        seed,
    };

    if args.format == "json" {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error: {}", e),
        }
    } else {
        println!("=== Scenario Result ===");
        println!("Outcome: {} after {} waves", result.outcome, result.waves_cleared);
        println!("Objective health: {:.0}%", result.objective_health * 100.0);
        println!("Kills: {}  Leaked: {}", result.kills, result.leaked);
        println!(
            "Actions: {} place, {} sell, {} upgrade, {} wait, {} rejected, {} lapses",
            result.actions.place,
            result.actions.sell,
            result.actions.upgrade,
            result.actions.wait,
            result.actions.rejected,
            result.actions.lapses
        );
        println!("Emplacements: {}  Resources: {}", result.emplacements, result.resources);
    }

    if args.reasoning {
        if let Some(Ok(json)) = agent.reasoning().map(|r| r.to_json()) {
            println!("{}", json);
        }
    }
}
