//! Dynamic difficulty: nudges the profile from the objective health trend

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::AdjusterConfig;
use crate::humanize::profile::{DifficultyBounds, DifficultyProfile};

/// How the match is going for the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Standing {
    /// Losing health or already low: try harder
    Struggling,
    Steady,
    /// Healthy and not slipping: ease off
    Dominating,
}

#[derive(Debug, Clone)]
pub struct DifficultyAdjuster {
    config: AdjusterConfig,
    bounds: DifficultyBounds,
    history: VecDeque<f32>,
}

impl DifficultyAdjuster {
    pub fn new(config: &AdjusterConfig, bounds: &DifficultyBounds) -> Self {
        Self {
            config: config.clone(),
            bounds: bounds.clone(),
            history: VecDeque::with_capacity(config.window),
        }
    }

    /// Record one objective health sample; non-finite samples are ignored
    pub fn record(&mut self, objective_health: f32) {
        if !objective_health.is_finite() {
            return;
        }
        if self.history.len() >= self.config.window.max(2) {
            self.history.pop_front();
        }
        self.history.push_back(objective_health.clamp(0.0, 1.0));
    }

    pub fn samples(&self) -> usize {
        self.history.len()
    }

    /// Mean health change per sample over the window
    pub fn trend(&self) -> f32 {
        match (self.history.front(), self.history.back()) {
            (Some(first), Some(last)) if self.history.len() >= 2 => {
                (last - first) / (self.history.len() - 1) as f32
            }
            _ => 0.0,
        }
    }

    pub fn standing(&self) -> Standing {
        let Some(&latest) = self.history.back() else {
            return Standing::Steady;
        };
        let trend = self.trend();
        if latest < self.config.struggle_health || trend < -self.config.trend_epsilon {
            Standing::Struggling
        } else if latest > self.config.dominate_health && trend >= -self.config.trend_epsilon {
            Standing::Dominating
        } else {
            Standing::Steady
        }
    }

    /// Profile tuned for the current standing, always within bounds
    ///
    /// Needs a full window of samples before it moves anything.
    pub fn adjust(&self, profile: &DifficultyProfile) -> DifficultyProfile {
        if self.history.len() < self.config.window.max(2) {
            return self.bounds.clamp(profile);
        }
        let direction = match self.standing() {
            Standing::Struggling => -1.0,
            Standing::Steady => return self.bounds.clamp(profile),
            Standing::Dominating => 1.0,
        };
        let step = self.config.step * direction;
        let b = &self.bounds;
        let adjusted = DifficultyProfile {
            name: profile.name.clone(),
            reaction_delay: profile.reaction_delay + step * b.reaction_delay.span(),
            placement_error_radius: profile.placement_error_radius + step * b.placement_error_radius.span(),
            skip_probability: profile.skip_probability + step * b.skip_probability.span(),
        };
        let adjusted = self.bounds.clamp(&adjusted);
        debug!(
            standing = ?self.standing(),
            delay = adjusted.reaction_delay,
            error = adjusted.placement_error_radius,
            skip = adjusted.skip_probability,
            "difficulty adjusted"
        );
        adjusted
    }
}
