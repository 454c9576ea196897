//! Read-only export of one cycle's reasoning, for "show AI reasoning" overlays

use serde::{Deserialize, Serialize};

use crate::core::types::{CellCoord, Cycle};
use crate::decision::candidate::CandidateAction;
use crate::decision::engine::SignalScores;
use crate::humanize::filter::DelayedAction;
use crate::spatial::field::ScalarField;

/// A recoverable problem met during a cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CycleDiagnostic {
    FlowFieldUndersized { expected: usize, actual: usize },
    TracesAbandoned { count: usize },
    OriginsSkipped { count: usize },
    NonFiniteInput { what: String, count: usize },
    CandidatesDropped { stale: usize, unaffordable: usize },
    PendingDropped { reason: String },
    AttentionLapse,
    Disabled,
    ExecutionFailed { reason: String },
    BudgetExceeded { elapsed_us: u64, budget_us: u64 },
}

/// Everything the agent looked at and concluded in one cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningSnapshot {
    pub cycle: Cycle,
    pub threat: ScalarField,
    pub coverage: ScalarField,
    pub traffic: ScalarField,
    pub hot_spots: Vec<CellCoord>,
    pub scores: SignalScores,
    /// Best surviving candidates, best first, plus the leader of every
    /// bucket that would otherwise be cut off
    pub top_candidates: Vec<CandidateAction>,
    pub chosen: CandidateAction,
    /// What actually went out this cycle, if anything
    pub issued: Option<DelayedAction>,
    pub diagnostics: Vec<CycleDiagnostic>,
}

/// Head of a ranked candidate list, topped up with each bucket's leader
pub fn top_candidates(ranked: &[CandidateAction], limit: usize) -> Vec<CandidateAction> {
    let mut top: Vec<CandidateAction> = ranked.iter().take(limit).cloned().collect();
    for candidate in ranked.iter().skip(limit) {
        if !top.iter().any(|c| c.bucket == candidate.bucket) {
            top.push(candidate.clone());
        }
    }
    top
}

impl ReasoningSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn has_diagnostic(&self, pred: impl Fn(&CycleDiagnostic) -> bool) -> bool {
        self.diagnostics.iter().any(pred)
    }
}
