use chrono::Utc;

use crate::model::board::{Board, BoardError};
use crate::model::id::is_path_safe;
use crate::model::list::TaskList;
use crate::model::task::{Task, TaskPatch};
use crate::ops::history::History;
use crate::ops::plan::insert_index_for_new_list;

/// Error type for store mutations. A failed mutation leaves the board as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("list not found: {0}")]
    ListNotFound(String),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("the Completed list cannot be {0}")]
    ProtectedList(&'static str),
    #[error("invalid position: {0}")]
    InvalidPosition(String),
    #[error("name cannot be empty")]
    EmptyName,
    #[error("a drag is in progress")]
    DragInProgress,
    #[error("invalid board: {0}")]
    InvalidBoard(#[from] BoardError),
}

/// Where to insert a new task in a list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertPosition {
    Top,
    Bottom,
    /// Insert before the task with this id
    Before(String),
}

/// The authoritative in-memory board.
///
/// Every committed mutation bumps `revision`, which is what the autosave
/// watches. Drag previews are applied on top of a snapshot and either
/// committed or rolled back as a whole.
#[derive(Debug)]
pub struct BoardStore {
    board: Board,
    history: History<Board>,
    revision: u64,
    preview_base: Option<Board>,
    open_task: Option<String>,
}

impl BoardStore {
    pub fn new(board: Board, history_limit: usize) -> Result<Self, StoreError> {
        let mut board = board;
        board.normalize();
        board.validate()?;
        Ok(BoardStore {
            board,
            history: History::new(history_limit),
            revision: 0,
            preview_base: None,
            open_task: None,
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The board as of the last commit, without any drag preview on top
    pub fn committed(&self) -> &Board {
        self.preview_base.as_ref().unwrap_or(&self.board)
    }

    pub fn is_previewing(&self) -> bool {
        self.preview_base.is_some()
    }

    // -----------------------------------------------------------------------
    // Planner output
    // -----------------------------------------------------------------------

    /// Adopt a planned board wholesale. Returns the ids of lists whose
    /// contents changed (empty if the board was already identical).
    pub fn apply_move(&mut self, next: Board) -> Result<Vec<String>, StoreError> {
        self.ensure_idle()?;
        next.validate()?;
        let before = self.board.clone();
        let changed = self.reconcile(next);
        if !changed.is_empty() {
            self.commit(before);
        }
        Ok(changed)
    }

    /// Swap in `next`, reporting which lists differ from the current board.
    fn reconcile(&mut self, next: Board) -> Vec<String> {
        let mut changed: Vec<String> = next
            .lists
            .iter()
            .enumerate()
            .filter(|(idx, list)| self.board.lists.get(*idx) != Some(*list))
            .map(|(_, list)| list.id.clone())
            .collect();
        for old in &self.board.lists {
            if next.list_index(&old.id).is_none() {
                changed.push(old.id.clone());
            }
        }
        if !changed.is_empty() {
            self.board = next;
            self.forget_missing_open_task();
        }
        changed
    }

    fn commit(&mut self, before: Board) {
        self.history.push(before);
        self.revision += 1;
    }

    fn ensure_idle(&self) -> Result<(), StoreError> {
        if self.is_previewing() {
            return Err(StoreError::DragInProgress);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Drag previews
    // -----------------------------------------------------------------------

    /// Snapshot the board so later previews can be rolled back
    pub fn begin_preview(&mut self) {
        if self.preview_base.is_none() {
            self.preview_base = Some(self.board.clone());
        }
    }

    /// Show a provisional board. Not saved, not in history.
    pub fn preview(&mut self, next: Board) -> Result<Vec<String>, StoreError> {
        next.validate()?;
        self.begin_preview();
        Ok(self.reconcile(next))
    }

    /// Reorder inside one list, the way the list itself would while a card
    /// is dragged within it. Outside a drag this is a normal committed edit.
    pub fn reorder_within_list(
        &mut self,
        list_id: &str,
        from: usize,
        to: usize,
    ) -> Result<bool, StoreError> {
        let before = if self.is_previewing() {
            None
        } else {
            Some(self.board.clone())
        };
        let list = self
            .board
            .list_mut(list_id)
            .ok_or_else(|| StoreError::ListNotFound(list_id.to_string()))?;
        let len = list.tasks.len();
        if from >= len || to >= len {
            return Err(StoreError::InvalidPosition(format!(
                "{from} -> {to} out of range (0..{len})"
            )));
        }
        let moved = list.reorder(from, to);
        if moved && let Some(before) = before {
            self.commit(before);
        }
        Ok(moved)
    }

    /// Keep everything shown during the drag. Returns true if the board
    /// differs from when the drag started.
    pub fn commit_preview(&mut self) -> bool {
        let Some(base) = self.preview_base.take() else {
            return false;
        };
        if base == self.board {
            return false;
        }
        self.commit(base);
        true
    }

    /// Throw away every preview since the drag started
    pub fn rollback_preview(&mut self) {
        if let Some(base) = self.preview_base.take() {
            self.board = base;
            self.forget_missing_open_task();
        }
    }

    // -----------------------------------------------------------------------
    // Lists
    // -----------------------------------------------------------------------

    /// Add an empty list right before Completed. Returns its id.
    pub fn add_list(&mut self, name: &str) -> Result<String, StoreError> {
        self.ensure_idle()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        let before = self.board.clone();
        let list = TaskList::new(name);
        let id = list.id.clone();
        let at = insert_index_for_new_list(&self.board.lists);
        self.board.lists.insert(at, list);
        self.commit(before);
        Ok(id)
    }

    pub fn rename_list(&mut self, list_id: &str, name: &str) -> Result<bool, StoreError> {
        self.ensure_idle()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        let before = self.board.clone();
        let list = self
            .board
            .list_mut(list_id)
            .ok_or_else(|| StoreError::ListNotFound(list_id.to_string()))?;
        if list.header == name {
            return Ok(false);
        }
        list.header = name.to_string();
        self.commit(before);
        Ok(true)
    }

    /// Remove a list and its tasks. The Completed list is refused.
    pub fn delete_list(&mut self, list_id: &str) -> Result<TaskList, StoreError> {
        self.ensure_idle()?;
        let idx = self
            .board
            .list_index(list_id)
            .ok_or_else(|| StoreError::ListNotFound(list_id.to_string()))?;
        if self.board.lists[idx].is_completed() {
            return Err(StoreError::ProtectedList("deleted"));
        }
        let before = self.board.clone();
        let removed = self.board.lists.remove(idx);
        self.forget_missing_open_task();
        self.commit(before);
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    /// Insert a task into a list. Returns its id.
    pub fn add_task(
        &mut self,
        list_id: &str,
        task: Task,
        position: InsertPosition,
    ) -> Result<String, StoreError> {
        self.ensure_idle()?;
        if !is_path_safe(&task.id) {
            return Err(BoardError::UnsafeTaskId(task.id).into());
        }
        if self.board.find_task(&task.id).is_some() {
            return Err(BoardError::DuplicateTask(task.id).into());
        }
        let list_idx = self
            .board
            .list_index(list_id)
            .ok_or_else(|| StoreError::ListNotFound(list_id.to_string()))?;
        let list = &self.board.lists[list_idx];
        let at = match &position {
            InsertPosition::Top => 0,
            InsertPosition::Bottom => list.tasks.len(),
            InsertPosition::Before(before_id) => list
                .position_of(before_id)
                .ok_or_else(|| StoreError::TaskNotFound(before_id.clone()))?,
        };

        let mut task = task;
        task.completed_at = if list.is_completed() {
            task.completed_at.or_else(|| Some(Utc::now()))
        } else {
            None
        };
        let id = task.id.clone();
        let before = self.board.clone();
        self.board.lists[list_idx].tasks.insert(at, task);
        self.commit(before);
        Ok(id)
    }

    pub fn delete_task(&mut self, task_id: &str) -> Result<Task, StoreError> {
        self.ensure_idle()?;
        let loc = self
            .board
            .find_task(task_id)
            .ok_or_else(|| StoreError::TaskNotFound(task_id.to_string()))?;
        let before = self.board.clone();
        let removed = self.board.lists[loc.list_index]
            .tasks
            .remove(loc.task_index);
        self.forget_missing_open_task();
        self.commit(before);
        Ok(removed)
    }

    /// Apply a partial update. Returns false if nothing changed.
    pub fn update_task(&mut self, task_id: &str, patch: TaskPatch) -> Result<bool, StoreError> {
        self.ensure_idle()?;
        if self.board.find_task(task_id).is_none() {
            return Err(StoreError::TaskNotFound(task_id.to_string()));
        }
        if patch.is_empty() {
            return Ok(false);
        }
        let before = self.board.clone();
        let changed = match self.board.task_mut(task_id) {
            Some(task) => patch.apply(task),
            None => false,
        };
        if changed {
            self.commit(before);
        }
        Ok(changed)
    }

    // -----------------------------------------------------------------------
    // Open task (details sheet)
    // -----------------------------------------------------------------------

    pub fn open_task(&mut self, task_id: &str) -> Result<(), StoreError> {
        if self.board.find_task(task_id).is_none() {
            return Err(StoreError::TaskNotFound(task_id.to_string()));
        }
        self.open_task = Some(task_id.to_string());
        Ok(())
    }

    pub fn close_task(&mut self) {
        self.open_task = None;
    }

    /// The task shown in the details sheet, wherever it has moved to
    pub fn opened(&self) -> Option<&Task> {
        self.open_task.as_deref().and_then(|id| self.board.task(id))
    }

    fn forget_missing_open_task(&mut self) {
        if let Some(id) = &self.open_task
            && self.board.find_task(id).is_none()
        {
            self.open_task = None;
        }
    }

    // -----------------------------------------------------------------------
    // Whole-board operations
    // -----------------------------------------------------------------------

    /// Take a board that changed outside this process. Identical boards are
    /// ignored. History is cleared so undo never crosses an external change.
    pub fn replace_board(&mut self, board: Board) -> Result<bool, StoreError> {
        self.ensure_idle()?;
        let mut board = board;
        board.normalize();
        board.validate()?;
        if board == self.board {
            return Ok(false);
        }
        self.board = board;
        self.history.clear();
        self.forget_missing_open_task();
        Ok(true)
    }

    pub fn undo(&mut self) -> bool {
        if self.is_previewing() {
            return false;
        }
        let current = self.board.clone();
        match self.history.undo(current) {
            Some(prev) => {
                self.board = prev;
                self.revision += 1;
                self.forget_missing_open_task();
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        if self.is_previewing() {
            return false;
        }
        let current = self.board.clone();
        match self.history.redo(current) {
            Some(next) => {
                self.board = next;
                self.revision += 1;
                self.forget_missing_open_task();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::list::COMPLETED_LIST_ID;
    use pretty_assertions::assert_eq;

    fn store() -> BoardStore {
        let mut a = TaskList::with_id("a", "A");
        a.tasks = vec![Task::with_id("t1", "one"), Task::with_id("t2", "two")];
        let b = TaskList::with_id("b", "B");
        BoardStore::new(
            Board::new(vec![a, b, TaskList::completed("Completed")]),
            50,
        )
        .unwrap()
    }

    fn list_ids(store: &BoardStore) -> Vec<&str> {
        store.board().lists.iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn add_task_refuses_unsafe_id() {
        let mut s = store();
        assert_eq!(
            s.add_task("a", Task::with_id("../x", "x"), InsertPosition::Top),
            Err(StoreError::InvalidBoard(BoardError::UnsafeTaskId("../x".into())))
        );
        assert_eq!(s.revision(), 0);
    }

    #[test]
    fn committed_ignores_previews() {
        let mut s = store();
        let before = s.board().clone();
        s.begin_preview();
        assert!(s.reorder_within_list("a", 0, 1).unwrap());
        assert_ne!(s.board(), &before);
        assert_eq!(s.committed(), &before);
        s.rollback_preview();
        assert_eq!(s.committed(), s.board());
    }

    #[test]
    fn new_normalizes_and_validates() {
        let board = Board::new(vec![TaskList::completed("C"), TaskList::with_id("a", "A")]);
        let store = BoardStore::new(board, 10).unwrap();
        assert_eq!(list_ids(&store), vec!["a", COMPLETED_LIST_ID]);

        let dup = Board::new(vec![TaskList::with_id("a", "A"), TaskList::with_id("a", "B")]);
        assert!(matches!(
            BoardStore::new(dup, 10),
            Err(StoreError::InvalidBoard(BoardError::DuplicateList(_)))
        ));
    }

    #[test]
    fn add_list_goes_before_completed() {
        let mut s = store();
        let id = s.add_list("  C  ").unwrap();
        assert_eq!(list_ids(&s), vec!["a", "b", id.as_str(), COMPLETED_LIST_ID]);
        assert_eq!(s.board().list(&id).unwrap().header, "C");
        assert_eq!(s.revision(), 1);
        assert_eq!(s.add_list("   "), Err(StoreError::EmptyName));
    }

    #[test]
    fn delete_completed_is_refused() {
        let mut s = store();
        assert_eq!(
            s.delete_list(COMPLETED_LIST_ID),
            Err(StoreError::ProtectedList("deleted"))
        );
        assert_eq!(s.revision(), 0);
        let removed = s.delete_list("a").unwrap();
        assert_eq!(removed.tasks.len(), 2);
        assert_eq!(list_ids(&s), vec!["b", COMPLETED_LIST_ID]);
    }

    #[test]
    fn rename_list_reports_changes() {
        let mut s = store();
        assert_eq!(s.rename_list("b", "Doing"), Ok(true));
        assert_eq!(s.rename_list("b", "Doing"), Ok(false));
        assert_eq!(s.rename_list("zz", "x"), Err(StoreError::ListNotFound("zz".into())));
        assert_eq!(s.revision(), 1);
    }

    #[test]
    fn add_task_positions() {
        let mut s = store();
        s.add_task("a", Task::with_id("top", "top"), InsertPosition::Top).unwrap();
        s.add_task("a", Task::with_id("mid", "mid"), InsertPosition::Before("t2".into()))
            .unwrap();
        s.add_task("a", Task::with_id("end", "end"), InsertPosition::Bottom).unwrap();
        let ids: Vec<&str> = s.board().lists[0].tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["top", "t1", "mid", "t2", "end"]);
    }

    #[test]
    fn add_task_rejects_duplicates_and_unknown_anchor() {
        let mut s = store();
        assert_eq!(
            s.add_task("b", Task::with_id("t1", "dup"), InsertPosition::Top),
            Err(StoreError::InvalidBoard(BoardError::DuplicateTask("t1".into())))
        );
        assert_eq!(
            s.add_task("b", Task::new("x"), InsertPosition::Before("ghost".into())),
            Err(StoreError::TaskNotFound("ghost".into()))
        );
        assert_eq!(s.revision(), 0);
    }

    #[test]
    fn add_task_keeps_completed_at_consistent() {
        let mut s = store();
        let mut stale = Task::with_id("x", "x");
        stale.completed_at = Some(Utc::now());
        s.add_task("a", stale, InsertPosition::Top).unwrap();
        assert!(s.board().task("x").unwrap().completed_at.is_none());

        s.add_task(COMPLETED_LIST_ID, Task::with_id("y", "y"), InsertPosition::Top)
            .unwrap();
        assert!(s.board().task("y").unwrap().completed_at.is_some());
    }

    #[test]
    fn update_task_applies_patch() {
        let mut s = store();
        let patch = TaskPatch {
            header: Some("renamed".into()),
            ..Default::default()
        };
        assert_eq!(s.update_task("t1", patch), Ok(true));
        assert_eq!(s.board().task("t1").unwrap().header, "renamed");
        assert_eq!(s.update_task("t1", TaskPatch::default()), Ok(false));
        assert_eq!(
            s.update_task("ghost", TaskPatch::default()),
            Err(StoreError::TaskNotFound("ghost".into()))
        );
    }

    #[test]
    fn open_task_follows_id_not_index() {
        let mut s = store();
        s.open_task("t2").unwrap();
        s.delete_task("t1").unwrap();
        assert_eq!(s.opened().unwrap().id, "t2");
        s.delete_task("t2").unwrap();
        assert!(s.opened().is_none());
    }

    #[test]
    fn preview_then_rollback_restores_board() {
        let mut s = store();
        let original = s.board().clone();
        let mut next = original.clone();
        let t = next.lists[0].tasks.remove(0);
        next.lists[1].tasks.push(t);

        let changed = s.preview(next).unwrap();
        assert_eq!(changed, vec!["a".to_string(), "b".to_string()]);
        assert!(s.is_previewing());
        assert_eq!(s.add_list("x"), Err(StoreError::DragInProgress));

        s.rollback_preview();
        assert_eq!(s.board(), &original);
        assert_eq!(s.revision(), 0);
    }

    #[test]
    fn preview_then_commit_is_one_undo_step() {
        let mut s = store();
        let original = s.board().clone();
        s.begin_preview();
        s.reorder_within_list("a", 0, 1).unwrap();
        s.reorder_within_list("a", 1, 0).unwrap();
        s.reorder_within_list("a", 0, 1).unwrap();
        assert_eq!(s.revision(), 0);
        assert!(s.commit_preview());
        assert_eq!(s.revision(), 1);

        assert!(s.undo());
        assert_eq!(s.board(), &original);
        assert!(s.redo());
        assert_eq!(s.board().lists[0].tasks[0].id, "t2");
    }

    #[test]
    fn commit_without_change_is_not_recorded() {
        let mut s = store();
        s.begin_preview();
        s.reorder_within_list("a", 0, 1).unwrap();
        s.reorder_within_list("a", 1, 0).unwrap();
        assert!(!s.commit_preview());
        assert_eq!(s.revision(), 0);
        assert!(!s.undo());
    }

    #[test]
    fn reorder_outside_drag_commits() {
        let mut s = store();
        assert_eq!(s.reorder_within_list("a", 0, 1), Ok(true));
        assert_eq!(s.revision(), 1);
        assert!(matches!(
            s.reorder_within_list("a", 0, 9),
            Err(StoreError::InvalidPosition(_))
        ));
    }

    #[test]
    fn apply_move_reports_changed_lists() {
        let mut s = store();
        let mut next = s.board().clone();
        next.lists[0].tasks.swap(0, 1);
        assert_eq!(s.apply_move(next.clone()), Ok(vec!["a".to_string()]));
        assert_eq!(s.apply_move(next), Ok(vec![]));
        assert_eq!(s.revision(), 1);
    }

    #[test]
    fn replace_board_ignores_identical_and_clears_history() {
        let mut s = store();
        s.add_list("x").unwrap();
        assert_eq!(s.replace_board(s.board().clone()), Ok(false));
        assert!(s.history.can_undo());

        let mut external = s.board().clone();
        external.lists[0].header = "External".into();
        assert_eq!(s.replace_board(external), Ok(true));
        assert!(!s.undo());
    }
}
