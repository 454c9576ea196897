//! Enemy movement archetypes

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Behavioural classification of an enemy
///
/// Tags arrive as strings from the simulation; anything unrecognised is
/// treated as `Direct`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Archetype {
    /// Straight at the objective
    Direct,
    /// Weaves side to side along its heading
    Strafing,
    /// Circles the objective
    Orbiting,
    /// Moves in loose packs
    Swarming,
    /// Goes after emplacements
    Hunting,
}

impl Archetype {
    pub const ALL: [Archetype; 5] = [
        Archetype::Direct,
        Archetype::Strafing,
        Archetype::Orbiting,
        Archetype::Swarming,
        Archetype::Hunting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::Direct => "direct",
            Archetype::Strafing => "strafing",
            Archetype::Orbiting => "orbiting",
            Archetype::Swarming => "swarming",
            Archetype::Hunting => "hunting",
        }
    }

    /// Parse a behaviour tag, falling back to `Direct`
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "direct" => Archetype::Direct,
            "strafing" | "strafe" => Archetype::Strafing,
            "orbiting" | "orbit" => Archetype::Orbiting,
            "swarming" | "swarm" => Archetype::Swarming,
            "hunting" | "hunter" => Archetype::Hunting,
            other => {
                debug!(tag = other, "unknown archetype tag, predicting as direct");
                Archetype::Direct
            }
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl From<String> for Archetype {
    fn from(tag: String) -> Self {
        Archetype::from_tag(&tag)
    }
}

impl From<Archetype> for String {
    fn from(archetype: Archetype) -> Self {
        archetype.as_str().to_string()
    }
}

impl std::fmt::Display for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
