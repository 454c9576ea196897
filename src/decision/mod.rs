//! Utility Decision Engine
//!
//! Candidates from every proposer are normalized, bucketed by priority and
//! reduced to one action per cycle. `DecisionMemory` is the only state that
//! survives between cycles.

pub mod candidate;
pub mod curves;
pub mod engine;
pub mod memory;

pub use candidate::{ActionKind, ActionTarget, CandidateAction, PriorityBucket, Provenance, ScoreBreakdown, UpgradePath};
pub use curves::ScoringCurve;
pub use engine::{SelectionContext, Selection, SignalScores, Signals, UtilityEngine};
pub use memory::{DecisionMemory, MemoryEntry};
