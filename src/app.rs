//! Composition root: one board store, the drag controller that feeds it,
//! and the persistence it saves through.

use std::path::Path;
use std::time::Instant;

use crate::dnd::{DragController, DragOutcome, Replacement, SessionError};
use crate::io::autosave::Autosave;
use crate::io::board_io::{BoardIoError, BoardPersistence};
use crate::io::watcher::BoardWatcher;
use crate::model::board::Board;
use crate::model::config::BoardConfig;
use crate::model::list::TaskList;
use crate::model::task::{Task, TaskPatch};
use crate::ops::collision::{DragSubject, Draggable, Droppable};
use crate::ops::plan::{Clock, MovePlan, MovePlanner, SystemClock};
use crate::store::{BoardStore, InsertPosition, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] BoardIoError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

pub struct BoardApp<P, C = SystemClock> {
    store: BoardStore,
    drag: DragController<C>,
    planner: MovePlanner<C>,
    autosave: Autosave,
    persistence: P,
    watcher: Option<BoardWatcher>,
    config: BoardConfig,
}

impl<P: BoardPersistence> BoardApp<P, SystemClock> {
    pub fn open(persistence: P, config: BoardConfig) -> Result<Self, AppError> {
        Self::open_with_clock(persistence, config, SystemClock)
    }
}

impl<P: BoardPersistence, C: Clock + Clone> BoardApp<P, C> {
    /// Load the board, or seed and save a fresh one if there is none yet
    pub fn open_with_clock(mut persistence: P, config: BoardConfig, clock: C) -> Result<Self, AppError> {
        let board = match persistence.load()? {
            Some(board) => board,
            None => {
                let board = Board::seeded(&config.board.default_list, &config.board.completed_header);
                persistence.save(&board)?;
                tracing::debug!("seeded a new board");
                board
            }
        };
        let store = BoardStore::new(board, config.history.limit)?;
        let autosave = Autosave::new(config.autosave.debounce(), store.revision());
        Ok(BoardApp {
            store,
            drag: DragController::with_clock(clock.clone()),
            planner: MovePlanner::new(clock),
            autosave,
            persistence,
            watcher: None,
            config,
        })
    }

    /// Follow external edits of the board file, if enabled in config.
    /// Returns true if a watcher is running.
    pub fn watch(&mut self, boards_dir: &Path) -> bool {
        if !self.config.watch.enabled {
            return false;
        }
        match BoardWatcher::start(boards_dir) {
            Ok(watcher) => self.watcher = Some(watcher),
            Err(e) => tracing::warn!(error = %e, "could not watch board directory"),
        }
        self.watcher.is_some()
    }

    pub fn board(&self) -> &Board {
        self.store.board()
    }

    pub fn store(&self) -> &BoardStore {
        &self.store
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    fn changed(&mut self) {
        self.autosave.note(Instant::now());
    }

    // -----------------------------------------------------------------------
    // Drag events
    // -----------------------------------------------------------------------

    pub fn drag_start(&mut self, subject: DragSubject) -> Result<(), SessionError> {
        self.drag.start(&mut self.store, subject)
    }

    pub fn drag_over(
        &mut self,
        draggable: &Draggable,
        droppables: &[Droppable],
    ) -> Result<Option<DragSubject>, SessionError> {
        self.drag.drag_over(&mut self.store, draggable, droppables)
    }

    pub fn drag_end(&mut self, draggable: &Draggable, droppables: &[Droppable]) -> DragOutcome {
        let outcome = self.drag.drag_end(&mut self.store, draggable, droppables);
        if outcome == DragOutcome::Committed {
            self.changed();
        }
        outcome
    }

    pub fn drag_cancel(&mut self) {
        self.drag.cancel(&mut self.store);
    }

    // -----------------------------------------------------------------------
    // Non-drag operations
    // -----------------------------------------------------------------------

    pub fn add_list(&mut self, name: &str) -> Result<String, AppError> {
        let id = self.store.add_list(name)?;
        self.changed();
        Ok(id)
    }

    pub fn rename_list(&mut self, list_id: &str, name: &str) -> Result<bool, AppError> {
        let changed = self.store.rename_list(list_id, name)?;
        if changed {
            self.changed();
        }
        Ok(changed)
    }

    pub fn delete_list(&mut self, list_id: &str) -> Result<TaskList, AppError> {
        let removed = self.store.delete_list(list_id)?;
        for task in &removed.tasks {
            self.discard(&task.id);
        }
        self.changed();
        Ok(removed)
    }

    /// Move a list to where `onto` currently is, as a drop would
    pub fn move_list(&mut self, list_id: &str, onto: &str) -> Result<bool, AppError> {
        let board = self.store.board();
        if board.list_index(list_id).is_none() {
            return Err(StoreError::ListNotFound(list_id.to_string()).into());
        }
        if board.list_index(onto).is_none() {
            return Err(StoreError::ListNotFound(onto.to_string()).into());
        }
        let plan = self
            .planner
            .plan(board, &DragSubject::list(list_id), &DragSubject::list(onto));
        self.apply_plan(plan)
    }

    pub fn add_task(&mut self, list_id: &str, task: Task, position: InsertPosition) -> Result<String, AppError> {
        let id = self.store.add_task(list_id, task, position)?;
        self.changed();
        Ok(id)
    }

    pub fn delete_task(&mut self, task_id: &str) -> Result<Task, AppError> {
        let removed = self.store.delete_task(task_id)?;
        self.discard(task_id);
        self.changed();
        Ok(removed)
    }

    pub fn update_task(&mut self, task_id: &str, patch: TaskPatch) -> Result<bool, AppError> {
        let changed = self.store.update_task(task_id, patch)?;
        if changed {
            self.changed();
        }
        Ok(changed)
    }

    /// Move a task into a list, before `before` if given, else to the end
    pub fn move_task(&mut self, task_id: &str, list_id: &str, before: Option<&str>) -> Result<bool, AppError> {
        let board = self.store.board();
        let owner = board
            .owner_of(task_id)
            .ok_or_else(|| StoreError::TaskNotFound(task_id.to_string()))?
            .to_string();
        if board.list_index(list_id).is_none() {
            return Err(StoreError::ListNotFound(list_id.to_string()).into());
        }
        let target = match before {
            Some(anchor) => {
                if board.owner_of(anchor) != Some(list_id) {
                    return Err(StoreError::TaskNotFound(anchor.to_string()).into());
                }
                DragSubject::task(anchor, list_id)
            }
            None => DragSubject::list(list_id),
        };
        let plan = self
            .planner
            .plan(board, &DragSubject::task(task_id, owner), &target);
        self.apply_plan(plan)
    }

    /// Send a task to the top of the Completed list
    pub fn complete_task(&mut self, task_id: &str) -> Result<bool, AppError> {
        let board = self.store.board();
        if board.find_task(task_id).is_none() {
            return Err(StoreError::TaskNotFound(task_id.to_string()).into());
        }
        let plan = self
            .planner
            .complete(board, task_id, &self.config.board.completed_header);
        self.apply_plan(plan)
    }

    fn apply_plan(&mut self, plan: MovePlan) -> Result<bool, AppError> {
        let Some(next) = plan.into_board() else {
            return Ok(false);
        };
        let changed = !self.store.apply_move(next)?.is_empty();
        if changed {
            self.changed();
        }
        Ok(changed)
    }

    pub fn open_task(&mut self, task_id: &str) -> Result<(), AppError> {
        Ok(self.store.open_task(task_id)?)
    }

    pub fn close_task(&mut self) {
        self.store.close_task();
    }

    pub fn opened(&self) -> Option<&Task> {
        self.store.opened()
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.store.undo();
        if undone {
            self.changed();
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.store.redo();
        if redone {
            self.changed();
        }
        redone
    }

    /// Take a board that changed outside this process. Mid-drag the board
    /// is held until the drop.
    pub fn replace_board(&mut self, board: Board) -> Result<Replacement, AppError> {
        Ok(self.drag.offer_replacement(&mut self.store, board)?)
    }

    /// Go back to an earlier board as a normal, saved and undoable edit
    pub fn restore(&mut self, board: Board) -> Result<bool, AppError> {
        self.apply_plan(MovePlan::Moved(board))
    }

    fn discard(&mut self, task_id: &str) {
        if let Err(e) = self.persistence.discard_task(task_id) {
            tracing::warn!(task = task_id, error = %e, "could not remove task files");
        }
    }

    // -----------------------------------------------------------------------
    // Event loop
    // -----------------------------------------------------------------------

    /// One pass of the app loop: pick up external edits, then save if due.
    /// Returns what happened to an external board, if one arrived.
    pub fn tick(&mut self, now: Instant) -> Option<Replacement> {
        let external = self.watcher.as_ref().and_then(|w| w.poll()).is_some();
        let replaced = if external { self.reload() } else { None };
        self.autosave.tick(&self.store, &mut self.persistence, now);
        replaced
    }

    /// Re-read the board from persistence and offer it to the store.
    /// Skipped while local changes are unsaved; the next save wins.
    pub fn reload(&mut self) -> Option<Replacement> {
        if self.has_unsaved_changes() {
            tracing::debug!("board changed on disk with local edits pending, keeping ours");
            return None;
        }
        match self.persistence.load() {
            Ok(Some(board)) => match self.drag.offer_replacement(&mut self.store, board) {
                Ok(outcome) => {
                    tracing::debug!(?outcome, "reloaded board");
                    Some(outcome)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "ignored external board");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "could not reload board");
                None
            }
        }
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.autosave.is_pending() || self.store.revision() != self.autosave.saved_revision()
    }

    /// Save now if anything is unsaved. Errors are returned, not retried.
    ///
    /// Mid-drag this writes the last committed board and leaves the drag
    /// and its preview alone.
    pub fn flush(&mut self) -> Result<bool, AppError> {
        if !self.has_unsaved_changes() {
            return Ok(false);
        }
        self.persistence.save(self.store.committed())?;
        self.autosave = Autosave::new(self.config.autosave.debounce(), self.store.revision());
        Ok(true)
    }
}
