//! Strategic defender agent
//!
//! Architecture: trait + data hybrid
//! - DefenseAi trait is the host loop's view of any defender implementation
//! - DifficultyProfile holds the TOML-loaded humanization knobs
//! - WorldSnapshot is the read-only world state handed in each cycle

pub mod executor;
pub mod planner;
pub mod reasoning;

pub use executor::{ActionExecutor, AiSwitch, ExecutionOutcome};
pub use planner::{CycleReport, StrategicAgent};
pub use reasoning::{CycleDiagnostic, ReasoningSnapshot};

use crate::humanize::profile::DifficultyProfile;
use crate::world::snapshot::WorldSnapshot;

/// Trait for defender AI implementations
pub trait DefenseAi {
    /// Process a single host tick; `None` when this tick was not an evaluation tick
    fn process_tick(
        &mut self,
        tick: u64,
        snapshot: &WorldSnapshot,
        executor: &mut dyn ActionExecutor,
    ) -> Option<CycleReport>;

    /// Active difficulty profile
    fn profile(&self) -> &DifficultyProfile;

    /// Latest reasoning export, if a cycle has run
    fn reasoning(&self) -> Option<&ReasoningSnapshot>;
}

impl DefenseAi for StrategicAgent {
    fn process_tick(
        &mut self,
        tick: u64,
        snapshot: &WorldSnapshot,
        executor: &mut dyn ActionExecutor,
    ) -> Option<CycleReport> {
        StrategicAgent::process_tick(self, tick, snapshot, executor)
    }

    fn profile(&self) -> &DifficultyProfile {
        StrategicAgent::profile(self)
    }

    fn reasoning(&self) -> Option<&ReasoningSnapshot> {
        StrategicAgent::reasoning(self)
    }
}
