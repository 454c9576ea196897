//! Fixed-size record of recent selections

use serde::{Deserialize, Serialize};

use crate::core::types::{CellCoord, Cycle, EmplacementId};
use crate::decision::candidate::{ActionKind, ActionTarget, PriorityBucket};

/// One past selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub cycle: Cycle,
    pub action: ActionKind,
    pub bucket: PriorityBucket,
}

/// Ring buffer of the last N selected actions
///
/// Every cycle records its selection, WAIT included, so the newest entry is
/// always the immediately preceding cycle's choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionMemory {
    entries: Vec<MemoryEntry>,
    capacity: usize,
}

impl DecisionMemory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, cycle: Cycle, action: ActionKind, bucket: PriorityBucket) {
        if self.entries.len() >= self.capacity {
            self.entries.remove(0); // Remove oldest
        }
        self.entries.push(MemoryEntry { cycle, action, bucket });
    }

    pub fn last(&self) -> Option<&MemoryEntry> {
        self.entries.last()
    }

    /// Target of the previous selection, if it had one
    pub fn last_target(&self) -> Option<ActionTarget> {
        self.last().and_then(|e| e.action.target())
    }

    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether selling `id` (standing on `cell`) is still on cooldown
    ///
    /// An emplacement the agent placed or upgraded within `cooldown` cycles
    /// may not be sold yet.
    pub fn blocks_sell(&self, id: EmplacementId, cell: CellCoord, now: Cycle, cooldown: Cycle) -> bool {
        let since = now.saturating_sub(cooldown);
        self.entries.iter().rev().any(|e| {
            e.cycle >= since
                && match e.action {
                    ActionKind::Place { cell: placed, .. } => placed == cell,
                    ActionKind::Upgrade { id: upgraded, .. } => upgraded == id,
                    _ => false,
                }
        })
    }
}

impl Default for DecisionMemory {
    fn default() -> Self {
        Self::new(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::EmplacementKind;

    fn place_at(x: i32, y: i32) -> ActionKind {
        ActionKind::Place {
            kind: EmplacementKind::Gatling,
            cell: CellCoord::new(x, y),
        }
    }

    #[test]
    fn test_ring_evicts_oldest() {
        let mut memory = DecisionMemory::new(3);
        for cycle in 1..=4 {
            memory.record(cycle, ActionKind::Wait, PriorityBucket::Opportunistic);
        }
        assert_eq!(memory.len(), 3);
        assert_eq!(memory.entries()[0].cycle, 2);
        assert_eq!(memory.last().map(|e| e.cycle), Some(4));
    }

    #[test]
    fn test_last_target_follows_latest() {
        let mut memory = DecisionMemory::default();
        memory.record(1, place_at(2, 3), PriorityBucket::Defense);
        assert_eq!(memory.last_target(), Some(ActionTarget::Cell(CellCoord::new(2, 3))));
        memory.record(2, ActionKind::Wait, PriorityBucket::Opportunistic);
        assert_eq!(memory.last_target(), None);
    }

    #[test]
    fn test_sell_cooldown_after_place() {
        let mut memory = DecisionMemory::default();
        let id = EmplacementId::new(9);
        memory.record(10, place_at(5, 5), PriorityBucket::Defense);

        assert!(memory.blocks_sell(id, CellCoord::new(5, 5), 25, 20));
        assert!(!memory.blocks_sell(id, CellCoord::new(5, 5), 31, 20));
        assert!(!memory.blocks_sell(id, CellCoord::new(4, 5), 25, 20));
    }

    #[test]
    fn test_sell_cooldown_after_upgrade() {
        let mut memory = DecisionMemory::default();
        let id = EmplacementId::new(3);
        memory.record(
            4,
            ActionKind::Upgrade {
                id,
                path: crate::decision::candidate::UpgradePath::Damage,
            },
            PriorityBucket::Economy,
        );
        assert!(memory.blocks_sell(id, CellCoord::new(0, 0), 10, 20));
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut memory = DecisionMemory::new(0);
        memory.record(1, ActionKind::Wait, PriorityBucket::Opportunistic);
        memory.record(2, ActionKind::Wait, PriorityBucket::Opportunistic);
        assert_eq!(memory.len(), 1);
    }
}
