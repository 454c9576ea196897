//! Reaction delay, placement jitter and attention lapses
//!
//! The humanizer never changes what kind of action was chosen or which
//! emplacement it refers to. It only decides when the action goes out and,
//! for PLACE, nudges the target cell.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::types::{CellCoord, Cycle};
use crate::decision::candidate::{ActionKind, CandidateAction};
use crate::humanize::profile::DifficultyProfile;
use crate::intercept::validity::PlacementValidator;

/// An action scheduled for a later cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayedAction {
    pub candidate: CandidateAction,
    pub decided_at: Cycle,
    pub issue_at: Cycle,
    /// The pre-jitter cell when a PLACE was moved
    pub original_cell: Option<CellCoord>,
}

impl DelayedAction {
    /// Issue immediately, unperturbed
    pub fn immediate(candidate: CandidateAction, now: Cycle) -> Self {
        Self {
            candidate,
            decided_at: now,
            issue_at: now,
            original_cell: None,
        }
    }

    pub fn is_due(&self, now: Cycle) -> bool {
        now >= self.issue_at
    }

    pub fn action(&self) -> &ActionKind {
        &self.candidate.action
    }

    pub fn was_jittered(&self) -> bool {
        self.original_cell.is_some()
    }
}

/// Seeded source of deliberate imperfection
#[derive(Debug, Clone)]
pub struct Humanizer {
    rng: ChaCha8Rng,
}

impl Humanizer {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Perturb one selection; `None` means the agent "missed" this cycle
    pub fn filter(
        &mut self,
        candidate: CandidateAction,
        profile: &DifficultyProfile,
        now: Cycle,
        validator: &dyn PlacementValidator,
    ) -> Option<DelayedAction> {
        if candidate.is_wait() {
            return Some(DelayedAction::immediate(candidate, now));
        }

        if self.rng.gen::<f32>() < profile.skip_probability {
            debug!(action = candidate.action.label(), "attention lapse, cycle skipped");
            return None;
        }

        let mut delayed = DelayedAction {
            issue_at: now + profile.delay_cycles(),
            decided_at: now,
            original_cell: None,
            candidate,
        };

        if let ActionKind::Place { kind, cell } = delayed.candidate.action {
            let moved = self.jitter(cell, profile.placement_error_radius);
            if moved != cell {
                if validator.is_valid_placement(moved, kind) {
                    delayed.candidate.action = ActionKind::Place { kind, cell: moved };
                    delayed.original_cell = Some(cell);
                } else {
                    debug!(?cell, ?moved, "jittered placement invalid, keeping original");
                }
            }
        }

        Some(delayed)
    }

    /// Uniform offset within `radius` cells, rounded to the grid
    fn jitter(&mut self, cell: CellCoord, radius: f32) -> CellCoord {
        if !(radius > 0.0) || !radius.is_finite() {
            return cell;
        }
        let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
        let distance = radius * self.rng.gen::<f32>().sqrt();
        let dx = (angle.cos() * distance).round() as i32;
        let dy = (angle.sin() * distance).round() as i32;
        cell.offset(dx, dy)
    }
}
