//! Agent configuration with documented constants
//!
//! All tuning knobs are collected here, grouped by the component that reads
//! them. Every section has defaults, so a TOML file only needs to name the
//! values it overrides.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::behavior::effectiveness::{default_effectiveness_rows, EffectivenessEntry};
use crate::core::error::{AgentError, Result};
use crate::core::types::EmplacementKind;
use crate::decision::curves::ScoringCurve;
use crate::humanize::profile::{DifficultyBounds, DifficultyProfile};
use crate::influence::falloff::{Falloff, Normalization};

/// Complete agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub influence: InfluenceConfig,
    #[serde(default)]
    pub traffic: TrafficConfig,
    #[serde(default)]
    pub intercept: InterceptConfig,
    #[serde(default)]
    pub behavior: BehaviorConfig,
    #[serde(default)]
    pub decision: DecisionConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub humanize: HumanizeConfig,
    #[serde(default = "default_emplacement_stats")]
    pub emplacements: Vec<EmplacementStats>,
}

// === CONTROL CYCLE ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Host ticks between decision cycles
    ///
    /// The host usually ticks at frame rate; at 15 the agent thinks four
    /// times a second on a 60 Hz loop.
    pub interval: u64,

    /// Soft wall-clock budget for one cycle, in milliseconds
    ///
    /// Exceeding it is logged, never enforced by aborting.
    pub budget_ms: u64,

    /// Seed for every RNG the agent owns
    pub seed: u64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            interval: 15,
            budget_ms: 4,
            seed: 42,
        }
    }
}

// === INFLUENCE MAPS ===

/// Parameters for one influence map build
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluenceParams {
    pub falloff: Falloff,
    /// Per-step retention during neighbour propagation (0.0 to 1.0)
    pub decay: f32,
    /// Number of neighbour propagation passes after stamping
    pub propagation_steps: usize,
    pub normalization: Normalization,
}

impl Default for InfluenceParams {
    fn default() -> Self {
        Self {
            falloff: Falloff::Linear,
            decay: 0.6,
            propagation_steps: 2,
            normalization: Normalization::MaxValue,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluenceConfig {
    pub threat: InfluenceParams,
    pub coverage: InfluenceParams,

    /// Radius (world units) of the footprint each enemy stamps on the threat map
    pub threat_radius: f32,

    /// Cycles of predicted motion folded into the threat map
    pub prediction_horizon: usize,

    /// Magnitude multiplier applied to predicted (not observed) positions
    ///
    /// Each successive predicted step is further scaled down linearly.
    pub predicted_weight: f32,

    /// Minimum separation, in cells, between reported hot-spots and gaps
    pub peak_separation: usize,
}

impl Default for InfluenceConfig {
    fn default() -> Self {
        Self {
            threat: InfluenceParams {
                falloff: Falloff::Quadratic,
                decay: 0.5,
                propagation_steps: 1,
                normalization: Normalization::MaxValue,
            },
            coverage: InfluenceParams {
                falloff: Falloff::Linear,
                decay: 0.0,
                propagation_steps: 0,
                normalization: Normalization::Percentile(0.95),
            },
            threat_radius: 3.0,
            prediction_horizon: 4,
            predicted_weight: 0.5,
            peak_separation: 3,
        }
    }
}

// === TRAFFIC ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    /// Hard cap on steps for a single flow-field trace
    pub max_steps: usize,

    /// Two neighbours whose alignment with the flow vector differs by less
    /// than this are considered tied; the cheaper one wins.
    pub tie_epsilon: f32,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            max_steps: 4096,
            tie_epsilon: 1e-3,
        }
    }
}

// === PATH INTERCEPTOR ===

/// Weights of the composite placement score
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterceptWeights {
    pub traffic: f32,
    pub perpendicularity: f32,
    pub paths_covered: f32,
    pub threat_intercept: f32,
    pub dwell_time: f32,
}

impl Default for InterceptWeights {
    fn default() -> Self {
        Self {
            traffic: 0.3,
            perpendicularity: 0.1,
            paths_covered: 0.25,
            threat_intercept: 0.15,
            dwell_time: 0.2,
        }
    }
}

impl InterceptWeights {
    pub fn total(&self) -> f32 {
        self.traffic + self.perpendicularity + self.paths_covered + self.threat_intercept + self.dwell_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterceptConfig {
    pub weights: InterceptWeights,

    /// Cells with traffic at or below this are never considered
    pub traffic_threshold: f32,

    /// Cells already covered at or above this are never considered
    pub coverage_threshold: f32,

    /// No placement closer than this (world units) to the objective
    pub safe_zone_radius: f32,

    /// Scores within this band are tied; the cheaper emplacement wins
    pub cost_epsilon: f32,

    /// Seconds of dwell at which the dwell term reaches ~63%
    pub dwell_scale: f32,

    /// Share of the final score taken by archetype counter effectiveness
    pub counter_weight: f32,

    /// Upper bound on proposals handed to the decision engine
    pub max_proposals: usize,
}

impl Default for InterceptConfig {
    fn default() -> Self {
        Self {
            weights: InterceptWeights::default(),
            traffic_threshold: 0.05,
            coverage_threshold: 0.75,
            safe_zone_radius: 1.5,
            cost_epsilon: 0.02,
            dwell_scale: 3.0,
            counter_weight: 0.15,
            max_proposals: 24,
        }
    }
}

// === BEHAVIOR PREDICTOR ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Seconds represented by one prediction step
    pub step_seconds: f32,

    /// Peak lateral offset for strafing enemies (world units)
    pub strafe_amplitude: f32,

    /// Strafe oscillation frequency (radians per second)
    pub strafe_frequency: f32,

    /// Maximum jitter radius for swarming enemies (world units)
    pub swarm_jitter: f32,

    /// Radius (cells) around a hot-spot used to find its dominant archetype
    pub counter_radius: i32,

    pub effectiveness: Vec<EffectivenessEntry>,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            step_seconds: 0.25,
            strafe_amplitude: 0.75,
            strafe_frequency: 3.0,
            swarm_jitter: 0.3,
            counter_radius: 4,
            effectiveness: default_effectiveness_rows(),
        }
    }
}

// === UTILITY DECISION ENGINE ===

/// Named curves each raw signal passes through before combination
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    pub health_urgency: ScoringCurve,
    pub distance_value: ScoringCurve,
    pub threat_response: ScoringCurve,
    pub coverage_gap: ScoringCurve,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            health_urgency: ScoringCurve::Exponential { steepness: 4.0 },
            distance_value: ScoringCurve::Quadratic,
            threat_response: ScoringCurve::Logistic {
                midpoint: 0.5,
                steepness: 10.0,
            },
            coverage_gap: ScoringCurve::Exponential { steepness: 2.0 },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub curves: CurveConfig,

    /// Health urgency at or above which defensive actions become CRISIS
    pub crisis_urgency: f32,

    /// Utility a candidate needs before the agent commits to it
    pub min_commit: f32,

    /// Bonus for repeating the previous cycle's target (same bucket only)
    pub inertia_bonus: f32,

    /// Entries kept in the decision ring buffer
    pub memory_size: usize,

    /// Cycles after placing/upgrading during which SELL of that target is blocked
    pub sell_cooldown: u64,

    /// Share of a candidate's utility driven by global signals
    pub signal_weight: f32,

    /// Waves before this number count as the early game
    pub early_wave_cutoff: u32,

    /// Early-game DEFENSE candidates below this utility drop to OPPORTUNISTIC
    pub early_defense_floor: f32,

    /// DEFENSE utility multiplier while a boss wave is imminent
    pub boss_defense_multiplier: f32,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            curves: CurveConfig::default(),
            crisis_urgency: 0.6,
            min_commit: 0.15,
            inertia_bonus: 0.08,
            memory_size: 8,
            sell_cooldown: 20,
            signal_weight: 0.3,
            early_wave_cutoff: 3,
            early_defense_floor: 0.35,
            boss_defense_multiplier: 1.25,
        }
    }
}

// === PERFORMANCE TRACKER ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Active cycles before an emplacement can be judged
    pub observation_window: u64,

    /// Damage per active cycle below which an emplacement counts as idle
    pub min_damage_per_cycle: f32,

    /// Traffic-in-range share below which upgrades go to range
    pub low_range_traffic: f32,

    /// Accuracy at or above which upgrades go to damage
    pub high_accuracy: f32,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            observation_window: 40,
            min_damage_per_cycle: 0.05,
            low_range_traffic: 0.3,
            high_accuracy: 0.6,
        }
    }
}

// === HUMANIZATION ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjusterConfig {
    /// Objective health samples kept for trend estimation
    pub window: usize,

    /// Health below this means the agent is struggling
    pub struggle_health: f32,

    /// Health above this (with a flat or rising trend) means dominating
    pub dominate_health: f32,

    /// Trend magnitude (health per sample) treated as flat
    pub trend_epsilon: f32,

    /// Fractional change applied to each profile parameter per adjustment
    pub step: f32,
}

impl Default for AdjusterConfig {
    fn default() -> Self {
        Self {
            window: 20,
            struggle_health: 0.5,
            dominate_health: 0.9,
            trend_epsilon: 0.002,
            step: 0.1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanizeConfig {
    pub profile: DifficultyProfile,
    pub bounds: DifficultyBounds,
    pub adjuster: AdjusterConfig,
}

// === EMPLACEMENT STATS ===

/// Base combat stats per emplacement kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmplacementStats {
    pub kind: EmplacementKind,
    /// Effective range in world units
    pub range: f32,
    /// Damage per second at base level
    pub dps: f32,
}

pub fn default_emplacement_stats() -> Vec<EmplacementStats> {
    vec![
        EmplacementStats { kind: EmplacementKind::Gatling, range: 3.0, dps: 10.0 },
        EmplacementStats { kind: EmplacementKind::Cannon, range: 3.5, dps: 14.0 },
        EmplacementStats { kind: EmplacementKind::Frost, range: 2.5, dps: 3.0 },
        EmplacementStats { kind: EmplacementKind::Laser, range: 4.5, dps: 12.0 },
        EmplacementStats { kind: EmplacementKind::Missile, range: 5.0, dps: 9.0 },
    ]
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            cycle: CycleConfig::default(),
            influence: InfluenceConfig::default(),
            traffic: TrafficConfig::default(),
            intercept: InterceptConfig::default(),
            behavior: BehaviorConfig::default(),
            decision: DecisionConfig::default(),
            performance: PerformanceConfig::default(),
            humanize: HumanizeConfig::default(),
            emplacements: default_emplacement_stats(),
        }
    }
}

impl AgentConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AgentConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Stats for one emplacement kind
    pub fn stats(&self, kind: EmplacementKind) -> Option<&EmplacementStats> {
        self.emplacements.iter().find(|s| s.kind == kind)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(AgentError::InvalidConfig(msg));

        if self.cycle.interval == 0 {
            return invalid("cycle.interval must be at least 1".into());
        }

        for (name, params) in [("threat", &self.influence.threat), ("coverage", &self.influence.coverage)] {
            if !(0.0..=1.0).contains(&params.decay) {
                return invalid(format!("influence.{}.decay ({}) must be in [0, 1]", name, params.decay));
            }
            if let Normalization::Percentile(p) = params.normalization {
                if !(p > 0.0 && p <= 1.0) {
                    return invalid(format!("influence.{} percentile ({}) must be in (0, 1]", name, p));
                }
            }
        }

        if self.traffic.max_steps == 0 {
            return invalid("traffic.max_steps must be positive".into());
        }

        let w = &self.intercept.weights;
        if [w.traffic, w.perpendicularity, w.paths_covered, w.threat_intercept, w.dwell_time]
            .iter()
            .any(|v| *v < 0.0)
            || w.total() <= 0.0
        {
            return invalid("intercept.weights must be non-negative with a positive sum".into());
        }
        if !(0.0..=1.0).contains(&self.intercept.counter_weight) {
            return invalid("intercept.counter_weight must be in [0, 1]".into());
        }

        let d = &self.decision;
        if d.memory_size == 0 {
            return invalid("decision.memory_size must be positive".into());
        }
        for (name, v) in [
            ("crisis_urgency", d.crisis_urgency),
            ("min_commit", d.min_commit),
            ("signal_weight", d.signal_weight),
            ("early_defense_floor", d.early_defense_floor),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return invalid(format!("decision.{} ({}) must be in [0, 1]", name, v));
            }
        }

        let a = &self.humanize.adjuster;
        if a.struggle_health >= a.dominate_health {
            return invalid(format!(
                "humanize.adjuster.struggle_health ({}) should be < dominate_health ({})",
                a.struggle_health, a.dominate_health
            ));
        }
        if a.window < 2 {
            return invalid("humanize.adjuster.window must be at least 2".into());
        }
        self.humanize.bounds.validate().map_err(AgentError::InvalidConfig)?;

        for kind in EmplacementKind::ALL {
            match self.stats(kind) {
                Some(stats) if stats.range > 0.0 && stats.dps >= 0.0 => {}
                Some(_) => return invalid(format!("emplacement {:?} needs positive range", kind)),
                None => return invalid(format!("emplacement {:?} has no stats", kind)),
            }
        }

        Ok(())
    }
}

/// Load agent config from a TOML file
pub fn load_agent_config(path: impl AsRef<Path>) -> Result<AgentConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    AgentConfig::from_toml_str(&contents)
}
