//! Difficulty profiles loaded from TOML
//!
//! A profile sets how human the agent looks: how late it reacts, how sloppy
//! its placements are and how often it simply does nothing.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::core::error::Result;

/// Imperfection knobs applied by the humanizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyProfile {
    /// Name of this profile (set from filename)
    pub name: String,
    /// Cycles between deciding and issuing an action (rounded)
    pub reaction_delay: f32,
    /// Maximum PLACE jitter in cells
    pub placement_error_radius: f32,
    /// Chance of ignoring a cycle's decision entirely (0.0 to 1.0)
    pub skip_probability: f32,
}

impl Default for DifficultyProfile {
    fn default() -> Self {
        Self {
            name: "standard".to_string(),
            reaction_delay: 2.0,
            placement_error_radius: 1.0,
            skip_probability: 0.05,
        }
    }
}

impl DifficultyProfile {
    /// A profile with no imperfection at all
    pub fn flawless() -> Self {
        Self {
            name: "flawless".to_string(),
            reaction_delay: 0.0,
            placement_error_radius: 0.0,
            skip_probability: 0.0,
        }
    }

    pub fn delay_cycles(&self) -> u64 {
        if self.reaction_delay.is_finite() && self.reaction_delay > 0.0 {
            self.reaction_delay.round() as u64
        } else {
            0
        }
    }
}

/// Inclusive range for one tunable parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
}

impl ParamRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_finite() {
            value.clamp(self.min, self.max)
        } else {
            self.min
        }
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }
}

/// Safe ranges the difficulty adjuster may move a profile within
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyBounds {
    pub reaction_delay: ParamRange,
    pub placement_error_radius: ParamRange,
    pub skip_probability: ParamRange,
}

impl Default for DifficultyBounds {
    fn default() -> Self {
        Self {
            reaction_delay: ParamRange::new(0.0, 6.0),
            placement_error_radius: ParamRange::new(0.0, 2.5),
            skip_probability: ParamRange::new(0.0, 0.3),
        }
    }
}

impl DifficultyBounds {
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (name, range) in [
            ("reaction_delay", self.reaction_delay),
            ("placement_error_radius", self.placement_error_radius),
            ("skip_probability", self.skip_probability),
        ] {
            if !(range.min.is_finite() && range.max.is_finite()) || range.min < 0.0 || range.min > range.max {
                return Err(format!(
                    "humanize.bounds.{} must satisfy 0 <= min ({}) <= max ({})",
                    name, range.min, range.max
                ));
            }
        }
        if self.skip_probability.max > 1.0 {
            return Err("humanize.bounds.skip_probability.max must be at most 1".into());
        }
        Ok(())
    }

    /// Pull every parameter of a profile into range
    pub fn clamp(&self, profile: &DifficultyProfile) -> DifficultyProfile {
        DifficultyProfile {
            name: profile.name.clone(),
            reaction_delay: self.reaction_delay.clamp(profile.reaction_delay),
            placement_error_radius: self.placement_error_radius.clamp(profile.placement_error_radius),
            skip_probability: self.skip_probability.clamp(profile.skip_probability),
        }
    }
}

/// Load a difficulty profile from TOML
///
/// Loads from `data/difficulty/{name}.toml`
pub fn load_difficulty_profile(name: &str) -> Result<DifficultyProfile> {
    let path = profile_path(name);
    let contents = fs::read_to_string(&path)?;
    let mut profile: DifficultyProfile = toml::from_str(&contents)?;
    profile.name = name.to_string();
    Ok(profile)
}

fn profile_path(name: &str) -> PathBuf {
    PathBuf::from("data/difficulty").join(format!("{}.toml", name))
}
