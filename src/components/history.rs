use std::collections::VecDeque;

use crate::field::FieldSnapshot;
use crate::ops::ramp::ColorRamp;

/// Default number of undo steps kept per history.
pub const MAX_HISTORY: usize = 20;

// ============================================================================
// SNAPSHOT TRAIT
// ============================================================================

/// Anything a history can hold. Reports its size so the stack can stay under
/// a memory budget.
pub trait Snapshot: Clone {
    fn memory_size(&self) -> usize;
}

impl Snapshot for FieldSnapshot {
    fn memory_size(&self) -> usize {
        FieldSnapshot::memory_size(self)
    }
}

impl Snapshot for ColorRamp {
    fn memory_size(&self) -> usize {
        std::mem::size_of::<ColorRamp>()
    }
}

// ============================================================================
// HISTORY STACK - bounded undo / redo of whole-state snapshots
// ============================================================================

/// Undo/redo stacks of full snapshots.
///
/// `push` records the state *before* an edit and clears the redo stack.
/// `undo` and `redo` take the current state so it can be moved to the other
/// stack, and hand back the state to restore.
pub struct History<T: Snapshot> {
    undo_stack: VecDeque<T>,
    redo_stack: VecDeque<T>,
    max_history_size: usize,
    /// Optional memory cap in bytes.
    max_memory_bytes: Option<usize>,
    /// Running memory total across both stacks.
    total_memory: usize,
}

impl<T: Snapshot> Default for History<T> {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}

impl<T: Snapshot> History<T> {
    pub fn new(max_history_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_history_size,
            max_memory_bytes: Some(256 * 1024 * 1024),
            total_memory: 0,
        }
    }

    pub fn with_memory_limit(mut self, max_bytes: Option<usize>) -> Self {
        self.max_memory_bytes = max_bytes;
        self.prune();
        self
    }

    pub fn push(&mut self, before: T) {
        for s in self.redo_stack.drain(..) {
            self.total_memory = self.total_memory.saturating_sub(s.memory_size());
        }
        self.total_memory += before.memory_size();
        self.undo_stack.push_back(before);
        self.prune();
    }

    /// Step back. Returns the state to restore, or `None` when there is nothing
    /// to undo (in which case `current` is dropped and nothing changes).
    pub fn undo(&mut self, current: T) -> Option<T> {
        let previous = self.undo_stack.pop_back()?;
        self.total_memory = self.total_memory.saturating_sub(previous.memory_size());
        self.total_memory += current.memory_size();
        self.redo_stack.push_back(current);
        Some(previous)
    }

    pub fn redo(&mut self, current: T) -> Option<T> {
        let next = self.redo_stack.pop_back()?;
        self.total_memory = self.total_memory.saturating_sub(next.memory_size());
        self.total_memory += current.memory_size();
        self.undo_stack.push_back(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Current memory usage of both stacks (O(1) via cached total).
    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.total_memory = 0;
    }

    /// Drop the oldest entries until both limits hold.
    fn prune(&mut self) {
        while self.undo_stack.len() > self.max_history_size {
            if let Some(removed) = self.undo_stack.pop_front() {
                self.total_memory = self.total_memory.saturating_sub(removed.memory_size());
            }
        }

        if let Some(max_bytes) = self.max_memory_bytes {
            while self.total_memory > max_bytes && self.undo_stack.len() > 1 {
                if let Some(removed) = self.undo_stack.pop_front() {
                    self.total_memory = self.total_memory.saturating_sub(removed.memory_size());
                }
            }
        }
    }
}
