/// Bounded undo/redo stack of snapshots.
///
/// Pushing drops the oldest entries past `limit` and clears redo.
#[derive(Debug, Clone)]
pub struct History<T> {
    undo: Vec<T>,
    redo: Vec<T>,
    limit: usize,
}

impl<T> History<T> {
    pub fn new(limit: usize) -> Self {
        History {
            undo: Vec::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record the state as it was before a mutation
    pub fn push(&mut self, state: T) {
        self.undo.push(state);
        if self.undo.len() > self.limit {
            self.undo.drain(..self.undo.len() - self.limit);
        }
        self.redo.clear();
    }

    /// Step back. `current` is kept for redo; returns the state to restore.
    pub fn undo(&mut self, current: T) -> Option<T> {
        let prev = self.undo.pop()?;
        self.redo.push(current);
        Some(prev)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: T) -> Option<T> {
        let next = self.redo.pop()?;
        self.undo.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_then_redo_round_trips() {
        let mut h = History::new(10);
        h.push(1);
        h.push(2);
        assert_eq!(h.undo(3), Some(2));
        assert_eq!(h.undo(2), Some(1));
        assert_eq!(h.undo(1), None);
        assert_eq!(h.redo(1), Some(2));
        assert_eq!(h.redo(2), Some(3));
        assert!(!h.can_redo());
    }

    #[test]
    fn push_clears_redo() {
        let mut h = History::new(10);
        h.push("a");
        assert_eq!(h.undo("b"), Some("a"));
        assert!(h.can_redo());
        h.push("c");
        assert!(!h.can_redo());
    }

    #[test]
    fn oldest_entries_drop_past_limit() {
        let mut h = History::new(3);
        for i in 0..5 {
            h.push(i);
        }
        assert_eq!(h.undo(99), Some(4));
        assert_eq!(h.undo(4), Some(3));
        assert_eq!(h.undo(3), Some(2));
        assert_eq!(h.undo(2), None);
    }

    #[test]
    fn clear_empties_both_stacks() {
        let mut h = History::new(3);
        h.push(1);
        h.undo(2);
        h.push(3);
        h.clear();
        assert!(!h.can_undo());
        assert!(!h.can_redo());
    }
}
