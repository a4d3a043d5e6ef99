//! Bounded undo/redo stack over full-tree snapshots.
//!
//! A snapshot is the ordered, deep-copied list of every rectangle. The
//! stack caps at a fixed size, evicting the oldest entry and rebasing the
//! index; recording after an undo truncates the redo branch; a snapshot
//! field-wise equal to the current top is skipped entirely.

use crate::rect::Rectangle;

/// Full copy of the tree at one point in time.
pub type Snapshot = Vec<Rectangle>;

#[derive(Debug, Clone)]
pub struct History {
    stack: Vec<Snapshot>,
    /// Position of the current state within `stack`.
    index: usize,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            stack: Vec::new(),
            index: 0,
            limit: limit.max(1),
        }
    }

    /// Record a snapshot. Returns false when it was skipped as a
    /// duplicate of the current state.
    pub fn push(&mut self, snapshot: Snapshot) -> bool {
        if !self.stack.is_empty() {
            self.stack.truncate(self.index + 1);
        }
        if self.stack.last() == Some(&snapshot) {
            return false;
        }
        self.stack.push(snapshot);
        if self.stack.len() > self.limit {
            let excess = self.stack.len() - self.limit;
            self.stack.drain(..excess);
        }
        self.index = self.stack.len() - 1;
        true
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.stack.is_empty() && self.index + 1 < self.stack.len()
    }

    /// Step back and return the snapshot to restore; `None` past the
    /// bottom of the stack (silent no-op, not an error).
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.stack.get(self.index)
    }

    pub fn redo(&mut self) -> Option<&Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.stack.get(self.index)
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.stack.get(self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rect::RectId;

    fn snap(tag: u64) -> Snapshot {
        vec![Rectangle::new(RectId(tag), None, 10.0, 10.0)]
    }

    #[test]
    fn identical_snapshot_is_recorded_once() {
        let mut history = History::new(50);
        assert!(history.push(snap(1)));
        assert!(!history.push(snap(1)));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn overflow_evicts_the_oldest_and_rebases_the_index() {
        let mut history = History::new(50);
        for tag in 0..60 {
            history.push(snap(tag));
        }
        assert_eq!(history.len(), 50);
        assert_eq!(history.index(), 49);
        // Oldest surviving entry is the 11th pushed.
        assert_eq!(history.stack[0], snap(10));
        assert_eq!(history.current(), Some(&snap(59)));
    }

    #[test]
    fn recording_after_undo_truncates_the_redo_branch() {
        let mut history = History::new(50);
        history.push(snap(1));
        history.push(snap(2));
        history.push(snap(3));
        assert_eq!(history.undo(), Some(&snap(2)));
        assert!(history.can_redo());
        history.push(snap(4));
        assert!(!history.can_redo());
        assert_eq!(history.len(), 3);
        assert_eq!(history.current(), Some(&snap(4)));
    }

    #[test]
    fn undo_redo_walk_the_stack_and_stop_at_the_bounds() {
        let mut history = History::new(50);
        history.push(snap(1));
        history.push(snap(2));
        assert_eq!(history.undo(), Some(&snap(1)));
        assert_eq!(history.undo(), None);
        assert_eq!(history.redo(), Some(&snap(2)));
        assert_eq!(history.redo(), None);
    }
}
