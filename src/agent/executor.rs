//! The bridge to the host's action executor

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::types::EmplacementId;
use crate::decision::candidate::ActionKind;

/// What the executor reports back, synchronously
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Success {
        /// Id assigned to a newly placed emplacement
        #[serde(default)]
        emplacement: Option<EmplacementId>,
    },
    Failed {
        reason: String,
    },
}

impl ExecutionOutcome {
    pub fn ok() -> Self {
        ExecutionOutcome::Success { emplacement: None }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        ExecutionOutcome::Failed { reason: reason.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success { .. })
    }
}

/// Performs the actual world mutation for an issued action
pub trait ActionExecutor {
    fn execute(&mut self, action: &ActionKind) -> ExecutionOutcome;
}

impl<F> ActionExecutor for F
where
    F: FnMut(&ActionKind) -> ExecutionOutcome,
{
    fn execute(&mut self, action: &ActionKind) -> ExecutionOutcome {
        self(action)
    }
}

/// Host-controlled on/off flag, shareable across threads
///
/// When off, the agent still runs its cycle but withholds the action.
#[derive(Debug, Clone)]
pub struct AiSwitch(Arc<AtomicBool>);

impl AiSwitch {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn enable(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn disable(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for AiSwitch {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_is_shared() {
        let host = AiSwitch::default();
        let agent = host.clone();
        assert!(agent.is_enabled());
        host.disable();
        assert!(!agent.is_enabled());
        host.enable();
        assert!(agent.is_enabled());
    }

    #[test]
    fn test_closure_executor() {
        let mut calls = 0;
        let mut exec = |action: &ActionKind| {
            calls += 1;
            if action.is_wait() {
                ExecutionOutcome::ok()
            } else {
                ExecutionOutcome::failed("no funds")
            }
        };
        assert!(exec.execute(&ActionKind::Wait).is_success());
        assert!(!exec.execute(&ActionKind::Sell { id: EmplacementId::new(1) }).is_success());
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_outcome_json() {
        let json = serde_json::to_string(&ExecutionOutcome::failed("blocked")).unwrap();
        assert_eq!(json, r#"{"status":"failed","reason":"blocked"}"#);
    }
}
