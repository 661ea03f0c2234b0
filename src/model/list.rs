use serde::{Deserialize, Serialize};

use super::id::generate_id;
use super::task::Task;

/// Well-known id of the reserved Completed list
pub const COMPLETED_LIST_ID: &str = "completed";

/// A kanban column: an ordered sequence of tasks, top to bottom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    pub id: String,
    pub header: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl TaskList {
    /// Create an empty list with a freshly generated id
    pub fn new(header: impl Into<String>) -> Self {
        Self::with_id(generate_id(), header)
    }

    pub fn with_id(id: impl Into<String>, header: impl Into<String>) -> Self {
        TaskList {
            id: id.into(),
            header: header.into(),
            tasks: Vec::new(),
        }
    }

    /// The reserved Completed list
    pub fn completed(header: impl Into<String>) -> Self {
        Self::with_id(COMPLETED_LIST_ID, header)
    }

    pub fn is_completed(&self) -> bool {
        self.id == COMPLETED_LIST_ID
    }

    pub fn position_of(&self, task_id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == task_id)
    }

    /// Array move: the task at `from` ends up at index `to`.
    /// Returns false (and leaves the list alone) if either index is out of
    /// range or nothing would move.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        if from == to || from >= self.tasks.len() || to >= self.tasks.len() {
            return false;
        }
        let task = self.tasks.remove(from);
        self.tasks.insert(to, task);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(ids: &[&str]) -> TaskList {
        let mut l = TaskList::with_id("l", "List");
        l.tasks = ids.iter().map(|id| Task::with_id(*id, *id)).collect();
        l
    }

    fn ids(l: &TaskList) -> Vec<&str> {
        l.tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn reorder_moves_up_and_down() {
        let mut l = list(&["a", "b", "c", "d"]);
        assert!(l.reorder(3, 0));
        assert_eq!(ids(&l), vec!["d", "a", "b", "c"]);
        assert!(l.reorder(0, 2));
        assert_eq!(ids(&l), vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn reorder_rejects_noop_and_out_of_range() {
        let mut l = list(&["a", "b"]);
        assert!(!l.reorder(1, 1));
        assert!(!l.reorder(0, 2));
        assert!(!l.reorder(5, 0));
        assert_eq!(ids(&l), vec!["a", "b"]);
    }

    #[test]
    fn completed_list_uses_reserved_id() {
        let l = TaskList::completed("Done");
        assert!(l.is_completed());
        assert_eq!(l.id, COMPLETED_LIST_ID);
        assert!(!TaskList::new("Todo").is_completed());
    }
}
