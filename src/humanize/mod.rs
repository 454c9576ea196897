//! Humanization Layer
//!
//! Injects reaction latency, placement error and attention lapses, and keeps
//! them tuned to how the match is going.

pub mod adjuster;
pub mod filter;
pub mod profile;

pub use adjuster::{DifficultyAdjuster, Standing};
pub use filter::{DelayedAction, Humanizer};
pub use profile::{load_difficulty_profile, DifficultyBounds, DifficultyProfile, ParamRange};
