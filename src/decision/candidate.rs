//! Candidate actions proposed each cycle

use serde::{Deserialize, Serialize};

use crate::core::types::{CellCoord, EmplacementId, EmplacementKind};

/// Which stat an upgrade improves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradePath {
    Damage,
    Range,
    Rate,
}

/// What the agent wants the executor to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    Place { kind: EmplacementKind, cell: CellCoord },
    Sell { id: EmplacementId },
    Upgrade { id: EmplacementId, path: UpgradePath },
    Wait,
}

/// The position or emplacement an action is aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionTarget {
    Cell(CellCoord),
    Emplacement(EmplacementId),
}

impl ActionKind {
    pub fn target(&self) -> Option<ActionTarget> {
        match *self {
            ActionKind::Place { cell, .. } => Some(ActionTarget::Cell(cell)),
            ActionKind::Sell { id } | ActionKind::Upgrade { id, .. } => Some(ActionTarget::Emplacement(id)),
            ActionKind::Wait => None,
        }
    }

    pub fn is_wait(&self) -> bool {
        matches!(self, ActionKind::Wait)
    }

    /// Emplacement the action refers to, if it must exist to be valid
    pub fn referenced_emplacement(&self) -> Option<EmplacementId> {
        match *self {
            ActionKind::Sell { id } | ActionKind::Upgrade { id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Place { .. } => "place",
            ActionKind::Sell { .. } => "sell",
            ActionKind::Upgrade { .. } => "upgrade",
            ActionKind::Wait => "wait",
        }
    }
}

/// Priority class; declaration order is ascending priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityBucket {
    Opportunistic,
    Economy,
    Defense,
    Crisis,
}

impl PriorityBucket {
    /// Highest first
    pub const DESCENDING: [PriorityBucket; 4] = [
        PriorityBucket::Crisis,
        PriorityBucket::Defense,
        PriorityBucket::Economy,
        PriorityBucket::Opportunistic,
    ];
}

/// Component that proposed a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    PathInterceptor,
    CoverageGap,
    PerformanceTracker,
    UtilityEngine,
}

/// Per-term contributions behind a candidate's score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub traffic: f32,
    pub perpendicularity: f32,
    pub paths_covered: f32,
    pub threat_intercept: f32,
    pub dwell_time: f32,
    /// Relative effectiveness against the local dominant archetype
    pub counter: f32,
    /// Global signal blend applied by the utility engine
    pub signal: f32,
    /// Distance value of the target cell relative to the objective
    pub distance: f32,
    /// Inertia bonus received during selection
    pub inertia: f32,
}

/// One proposed action with its scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateAction {
    pub action: ActionKind,
    /// Raw score from the proposing component, in [0, 1]
    pub score: f32,
    /// Score after signal weighting and phase bias, in [0, 1]
    pub utility: f32,
    pub bucket: PriorityBucket,
    pub source: Provenance,
    /// Resources spent if executed (0 for SELL and WAIT)
    pub cost: i64,
    pub breakdown: ScoreBreakdown,
}

impl CandidateAction {
    pub fn new(action: ActionKind, score: f32, cost: i64, bucket: PriorityBucket, source: Provenance) -> Self {
        let score = clamp_unit(score);
        Self {
            action,
            score,
            utility: score,
            bucket,
            source,
            cost,
            breakdown: ScoreBreakdown::default(),
        }
    }

    pub fn place(kind: EmplacementKind, cell: CellCoord, score: f32, cost: i64, source: Provenance) -> Self {
        Self::new(ActionKind::Place { kind, cell }, score, cost, PriorityBucket::Defense, source)
    }

    pub fn sell(id: EmplacementId, score: f32) -> Self {
        Self::new(
            ActionKind::Sell { id },
            score,
            0,
            PriorityBucket::Economy,
            Provenance::PerformanceTracker,
        )
    }

    pub fn upgrade(id: EmplacementId, path: UpgradePath, score: f32, cost: i64) -> Self {
        Self::new(
            ActionKind::Upgrade { id, path },
            score,
            cost,
            PriorityBucket::Economy,
            Provenance::PerformanceTracker,
        )
    }

    /// The do-nothing action
    pub fn wait() -> Self {
        Self::new(ActionKind::Wait, 0.0, 0, PriorityBucket::Opportunistic, Provenance::UtilityEngine)
    }

    pub fn with_bucket(mut self, bucket: PriorityBucket) -> Self {
        self.bucket = bucket;
        self
    }

    pub fn with_breakdown(mut self, breakdown: ScoreBreakdown) -> Self {
        self.breakdown = breakdown;
        self
    }

    pub fn is_wait(&self) -> bool {
        self.action.is_wait()
    }

    pub fn is_affordable(&self, resources: i64) -> bool {
        self.cost <= resources
    }
}

/// NaN reads as zero
pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
