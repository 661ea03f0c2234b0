use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::id::is_path_safe;
use super::list::{COMPLETED_LIST_ID, TaskList};
use super::task::{Tag, Task};

/// Error type for board validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("duplicate list id: {0}")]
    DuplicateList(String),
    #[error("duplicate task id: {0}")]
    DuplicateTask(String),
    #[error("task id is not usable as a file name: {0:?}")]
    UnsafeTaskId(String),
    #[error("the Completed list must be the last list")]
    CompletedNotLast,
}

/// Where a task currently sits on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskLocation {
    pub list_index: usize,
    pub task_index: usize,
}

/// The full board: lists left to right, each owning its tasks.
///
/// Persisted as a bare JSON array of lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    pub lists: Vec<TaskList>,
}

impl Board {
    pub fn new(lists: Vec<TaskList>) -> Self {
        Board { lists }
    }

    /// A fresh board: one working list followed by the Completed list
    pub fn seeded(default_list: &str, completed_header: &str) -> Self {
        Board {
            lists: vec![
                TaskList::new(default_list),
                TaskList::completed(completed_header),
            ],
        }
    }

    pub fn list_index(&self, list_id: &str) -> Option<usize> {
        self.lists.iter().position(|l| l.id == list_id)
    }

    pub fn list(&self, list_id: &str) -> Option<&TaskList> {
        self.lists.iter().find(|l| l.id == list_id)
    }

    pub fn list_mut(&mut self, list_id: &str) -> Option<&mut TaskList> {
        self.lists.iter_mut().find(|l| l.id == list_id)
    }

    pub fn completed_index(&self) -> Option<usize> {
        self.list_index(COMPLETED_LIST_ID)
    }

    /// Find which list a task is in and its index within that list
    pub fn find_task(&self, task_id: &str) -> Option<TaskLocation> {
        for (list_index, list) in self.lists.iter().enumerate() {
            if let Some(task_index) = list.position_of(task_id) {
                return Some(TaskLocation {
                    list_index,
                    task_index,
                });
            }
        }
        None
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        let loc = self.find_task(task_id)?;
        self.lists[loc.list_index].tasks.get(loc.task_index)
    }

    pub fn task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        let loc = self.find_task(task_id)?;
        self.lists[loc.list_index].tasks.get_mut(loc.task_index)
    }

    /// Id of the list that currently owns the task
    pub fn owner_of(&self, task_id: &str) -> Option<&str> {
        self.find_task(task_id)
            .map(|loc| self.lists[loc.list_index].id.as_str())
    }

    pub fn task_count(&self) -> usize {
        self.lists.iter().map(|l| l.tasks.len()).sum()
    }

    /// Check list/task id uniqueness, task id safety and the Completed-last rule
    pub fn validate(&self) -> Result<(), BoardError> {
        let mut list_ids = HashSet::new();
        let mut task_ids = HashSet::new();
        for list in &self.lists {
            if !list_ids.insert(list.id.as_str()) {
                return Err(BoardError::DuplicateList(list.id.clone()));
            }
            for task in &list.tasks {
                if !is_path_safe(&task.id) {
                    return Err(BoardError::UnsafeTaskId(task.id.clone()));
                }
                if !task_ids.insert(task.id.as_str()) {
                    return Err(BoardError::DuplicateTask(task.id.clone()));
                }
            }
        }
        if let Some(idx) = self.completed_index()
            && idx + 1 != self.lists.len()
        {
            return Err(BoardError::CompletedNotLast);
        }
        Ok(())
    }

    /// Move a misplaced Completed list back to the end.
    /// Returns true if the board changed.
    pub fn normalize(&mut self) -> bool {
        match self.completed_index() {
            Some(idx) if idx + 1 != self.lists.len() => {
                let completed = self.lists.remove(idx);
                self.lists.push(completed);
                true
            }
            _ => false,
        }
    }

    /// Distinct tags across the board, keyed by lowercase label, in
    /// first-seen order. The first occurrence decides the color.
    pub fn existing_tags(&self) -> IndexMap<String, Tag> {
        let mut tags = IndexMap::new();
        for task in self.lists.iter().flat_map(|l| l.tasks.iter()) {
            for tag in &task.tags {
                tags.entry(tag.label.to_lowercase())
                    .or_insert_with(|| tag.clone());
            }
        }
        tags
    }
}
