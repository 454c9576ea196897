//! Siegeward - Autonomous Tower-Defense Strategist
//!
//! A defender agent that reads a snapshot of the board each control cycle,
//! reasons about where enemies will go, and issues one PLACE, SELL, UPGRADE
//! or WAIT through a host-supplied executor.

pub mod agent;
pub mod behavior;
pub mod core;
pub mod decision;
pub mod humanize;
pub mod influence;
pub mod intercept;
pub mod performance;
pub mod spatial;
pub mod traffic;
pub mod world;

pub use crate::agent::{ActionExecutor, AiSwitch, DefenseAi, ExecutionOutcome, StrategicAgent};
pub use crate::core::config::AgentConfig;
pub use crate::core::error::{AgentError, Result};
pub use crate::decision::candidate::ActionKind;
pub use crate::world::snapshot::WorldSnapshot;
