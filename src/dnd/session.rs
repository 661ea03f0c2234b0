//! Drag session controller.
//!
//! Turns drag-over and drag-end callbacks into store mutations. Drag-over
//! previews task moves only (list reordering is left for the drop), and
//! reorders inside a single list go through the list's own reorder rather
//! than the board planner. Drag-end always commits through the planner.
//! Every path out of a drag leaves the controller idle.

use std::mem;

use crate::model::board::Board;
use crate::ops::collision::{DragSubject, Draggable, Droppable, detect_collision};
use crate::ops::plan::{Clock, MovePlan, MovePlanner, SystemClock};
use crate::store::{BoardStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("a drag is already in progress")]
    Busy,
    #[error("nothing is being dragged")]
    NotDragging,
    #[error("unknown drag subject: {0}")]
    UnknownSubject(String),
}

/// How a drag ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// The board changed and the change was committed
    Committed,
    /// A target was found but the drop left the board as it was
    Unchanged,
    /// No target, cancelled, or the final move failed. Previews were undone.
    Cancelled,
}

/// What happened to a board offered from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replacement {
    Applied,
    Identical,
    /// Held until the current drag ends
    Deferred,
}

#[derive(Debug)]
enum DragState {
    Idle,
    Dragging {
        subject: DragSubject,
        /// Target currently highlighted
        over: Option<DragSubject>,
    },
}

pub struct DragController<C = SystemClock> {
    planner: MovePlanner<C>,
    state: DragState,
    deferred: Option<Board>,
}

impl DragController<SystemClock> {
    pub fn new() -> Self {
        DragController::with_clock(SystemClock)
    }
}

impl Default for DragController<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> DragController<C> {
    pub fn with_clock(clock: C) -> Self {
        DragController {
            planner: MovePlanner::new(clock),
            state: DragState::Idle,
            deferred: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// The droppable currently highlighted, if any
    pub fn over(&self) -> Option<&DragSubject> {
        match &self.state {
            DragState::Dragging { over, .. } => over.as_ref(),
            DragState::Idle => None,
        }
    }

    /// Enter `Dragging`. Refused while another drag is active.
    pub fn start(&mut self, store: &mut BoardStore, subject: DragSubject) -> Result<(), SessionError> {
        if self.is_dragging() {
            return Err(SessionError::Busy);
        }
        let known = match &subject {
            DragSubject::List { id } => store.board().list_index(id).is_some(),
            DragSubject::Task { id, .. } => store.board().find_task(id).is_some(),
        };
        if !known {
            return Err(SessionError::UnknownSubject(subject.id().to_string()));
        }
        store.begin_preview();
        tracing::debug!(subject = subject.id(), "drag started");
        self.state = DragState::Dragging {
            subject,
            over: None,
        };
        Ok(())
    }

    /// Handle one pointer move. Returns the highlighted target.
    ///
    /// Frames whose move cannot be applied are logged and skipped; the drag
    /// carries on.
    pub fn drag_over(
        &mut self,
        store: &mut BoardStore,
        draggable: &Draggable,
        droppables: &[Droppable],
    ) -> Result<Option<DragSubject>, SessionError> {
        let DragState::Dragging { subject, over } = &mut self.state else {
            return Err(SessionError::NotDragging);
        };

        let current = with_current_owner(store.board(), draggable);
        let Some(hit) = detect_collision(&current, droppables) else {
            *over = None;
            return Ok(None);
        };
        let target = hit.subject.clone();
        *over = Some(target.clone());

        if subject.is_list() || !passes_target(store.board(), subject, &current, hit) {
            return Ok(Some(target));
        }
        if let Err(e) = preview_task_move(&self.planner, store, subject, &target) {
            tracing::warn!(subject = subject.id(), error = %e, "skipped drag-over frame");
        }
        Ok(Some(target))
    }

    /// Finish the drag. The controller is idle afterwards whatever happens.
    pub fn drag_end(
        &mut self,
        store: &mut BoardStore,
        draggable: &Draggable,
        droppables: &[Droppable],
    ) -> DragOutcome {
        let DragState::Dragging { subject, .. } = mem::replace(&mut self.state, DragState::Idle)
        else {
            return DragOutcome::Cancelled;
        };

        if let Some(board) = self.deferred.take() {
            store.rollback_preview();
            apply_replacement(store, board);
            store.begin_preview();
        }

        let current = with_current_owner(store.board(), draggable);
        let Some(hit) = detect_collision(&current, droppables) else {
            store.rollback_preview();
            tracing::debug!(subject = subject.id(), "drag ended without a target");
            return DragOutcome::Cancelled;
        };

        if passes_target(store.board(), &subject, &current, hit)
            && let MovePlan::Moved(next) = self.planner.plan(store.board(), &subject, &hit.subject)
            && let Err(e) = store.preview(next)
        {
            tracing::warn!(subject = subject.id(), error = %e, "final move rejected");
            store.rollback_preview();
            return DragOutcome::Cancelled;
        }

        if store.commit_preview() {
            tracing::debug!(subject = subject.id(), target = hit.subject.id(), "drag committed");
            DragOutcome::Committed
        } else {
            DragOutcome::Unchanged
        }
    }

    /// Abandon the drag as if it had been dropped nowhere
    pub fn cancel(&mut self, store: &mut BoardStore) {
        if let DragState::Dragging { subject, .. } = mem::replace(&mut self.state, DragState::Idle) {
            tracing::debug!(subject = subject.id(), "drag cancelled");
        }
        store.rollback_preview();
        if let Some(board) = self.deferred.take() {
            apply_replacement(store, board);
        }
    }

    /// Accept a whole board from outside. Mid-drag it is held and applied
    /// when the drag ends; later offers replace earlier ones.
    pub fn offer_replacement(
        &mut self,
        store: &mut BoardStore,
        board: Board,
    ) -> Result<Replacement, StoreError> {
        if self.is_dragging() {
            self.deferred = Some(board);
            return Ok(Replacement::Deferred);
        }
        if store.replace_board(board)? {
            Ok(Replacement::Applied)
        } else {
            Ok(Replacement::Identical)
        }
    }
}

/// Refresh the draggable's owning list from the board, since previews may
/// have moved it since the caller recorded it.
fn with_current_owner(board: &Board, draggable: &Draggable) -> Draggable {
    match &draggable.subject {
        DragSubject::Task { id, .. } => match board.owner_of(id) {
            Some(owner) => Draggable::new(DragSubject::task(id.clone(), owner), draggable.rect),
            None => draggable.clone(),
        },
        DragSubject::List { .. } => draggable.clone(),
    }
}

/// Within one list a card takes a neighbour's slot only once the pointer
/// has crossed that neighbour's center, otherwise the preview would flip
/// the two cards back and forth on every frame.
fn passes_target(board: &Board, subject: &DragSubject, current: &Draggable, hit: &Droppable) -> bool {
    let DragSubject::Task { id: target_id, .. } = &hit.subject else {
        return true;
    };
    let (Some(source), Some(dest)) = (board.find_task(subject.id()), board.find_task(target_id)) else {
        return true;
    };
    if source.list_index != dest.list_index {
        return true;
    }
    let pointer = current.rect.center().y;
    let center = hit.rect.center().y;
    if dest.task_index > source.task_index {
        pointer > center
    } else {
        pointer < center
    }
}

fn preview_task_move<C: Clock>(
    planner: &MovePlanner<C>,
    store: &mut BoardStore,
    subject: &DragSubject,
    target: &DragSubject,
) -> Result<(), StoreError> {
    let board = store.board();
    let Some(source) = board.find_task(subject.id()) else {
        return Err(StoreError::TaskNotFound(subject.id().to_string()));
    };
    let target_list = match target {
        DragSubject::List { id } => board.list_index(id),
        DragSubject::Task { id, .. } => board.find_task(id).map(|loc| loc.list_index),
    };

    if target_list == Some(source.list_index) {
        let list = &board.lists[source.list_index];
        let to = match target {
            DragSubject::List { .. } => list.tasks.len() - 1,
            DragSubject::Task { id, .. } => list
                .position_of(id)
                .ok_or_else(|| StoreError::TaskNotFound(id.clone()))?,
        };
        let list_id = list.id.clone();
        store.reorder_within_list(&list_id, source.task_index, to)?;
        return Ok(());
    }

    if let MovePlan::Moved(next) = planner.plan(board, subject, target) {
        store.preview(next)?;
    }
    Ok(())
}

fn apply_replacement(store: &mut BoardStore, board: Board) {
    match store.replace_board(board) {
        Ok(true) => tracing::debug!("applied deferred board"),
        Ok(false) => {}
        Err(e) => tracing::warn!(error = %e, "discarded deferred board"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::list::{COMPLETED_LIST_ID, TaskList};
    use crate::model::task::Task;
    use crate::ops::collision::Rect;
    use crate::ops::plan::FixedClock;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    const COL_W: f64 = 100.0;
    const CARD_H: f64 = 40.0;

    fn store(lists: &[(&str, &[&str])]) -> BoardStore {
        let mut out: Vec<TaskList> = lists
            .iter()
            .map(|(id, tasks)| {
                let mut list = TaskList::with_id(*id, id.to_uppercase());
                list.tasks = tasks.iter().map(|t| Task::with_id(*t, *t)).collect();
                list
            })
            .collect();
        out.push(TaskList::completed("Completed"));
        BoardStore::new(Board::new(out), 20).unwrap()
    }

    /// Geometry for the board as it currently stands
    fn layout(board: &Board) -> Vec<Droppable> {
        let mut out = Vec::new();
        for (col, list) in board.lists.iter().enumerate() {
            let x = col as f64 * (COL_W + 20.0);
            out.push(Droppable::new(
                DragSubject::list(list.id.clone()),
                Rect::new(x, 0.0, COL_W, 400.0),
            ));
            for (row, task) in list.tasks.iter().enumerate() {
                out.push(Droppable::new(
                    DragSubject::task(task.id.clone(), list.id.clone()),
                    Rect::new(x, 50.0 + row as f64 * CARD_H, COL_W, CARD_H),
                ));
            }
        }
        out
    }

    fn at(subject: DragSubject, col: usize, cy: f64) -> Draggable {
        let x = col as f64 * (COL_W + 20.0);
        Draggable::new(subject, Rect::new(x, cy - CARD_H / 2.0, COL_W, CARD_H))
    }

    fn ids(store: &BoardStore, list: &str) -> Vec<String> {
        store
            .board()
            .list(list)
            .unwrap()
            .tasks
            .iter()
            .map(|t| t.id.clone())
            .collect()
    }

    fn controller() -> DragController<FixedClock> {
        DragController::with_clock(FixedClock(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()))
    }

    #[test]
    fn second_start_is_refused() {
        let mut s = store(&[("todo", &["t1"])]);
        let mut c = controller();
        c.start(&mut s, DragSubject::task("t1", "todo")).unwrap();
        assert_eq!(c.start(&mut s, DragSubject::list("todo")), Err(SessionError::Busy));
    }

    #[test]
    fn unknown_subject_is_refused() {
        let mut s = store(&[("todo", &[])]);
        let mut c = controller();
        assert_eq!(
            c.start(&mut s, DragSubject::task("ghost", "todo")),
            Err(SessionError::UnknownSubject("ghost".into()))
        );
        assert!(!c.is_dragging());
    }

    #[test]
    fn cross_list_drag_previews_then_commits() {
        let mut s = store(&[("todo", &["t1", "t2"]), ("doing", &[])]);
        let mut c = controller();
        let subject = DragSubject::task("t1", "todo");
        c.start(&mut s, subject.clone()).unwrap();

        let drag = at(subject, 1, 60.0);
        let drops = layout(s.board());
        let over = c.drag_over(&mut s, &drag, &drops).unwrap();
        assert_eq!(over, Some(DragSubject::list("doing")));
        assert_eq!(ids(&s, "doing"), vec!["t1"]);
        assert_eq!(s.revision(), 0);

        let drops = layout(s.board());
        assert_eq!(c.drag_end(&mut s, &drag, &drops), DragOutcome::Committed);
        assert_eq!(ids(&s, "todo"), vec!["t2"]);
        assert_eq!(ids(&s, "doing"), vec!["t1"]);
        assert_eq!(s.revision(), 1);
        assert!(!c.is_dragging());
    }

    #[test]
    fn same_list_drag_reorders_locally() {
        let mut s = store(&[("todo", &["t1", "t2", "t3"])]);
        let mut c = controller();
        let subject = DragSubject::task("t3", "todo");
        c.start(&mut s, subject.clone()).unwrap();

        // Over t1's slot.
        let drag = at(subject, 0, 68.0);
        let drops = layout(s.board());
        c.drag_over(&mut s, &drag, &drops).unwrap();
        assert_eq!(ids(&s, "todo"), vec!["t3", "t1", "t2"]);

        // Same frame again: already shown, nothing moves.
        c.drag_over(&mut s, &drag, &drops).unwrap();
        assert_eq!(ids(&s, "todo"), vec!["t3", "t1", "t2"]);

        assert_eq!(c.drag_end(&mut s, &drag, &drops), DragOutcome::Committed);
        assert_eq!(ids(&s, "todo"), vec!["t3", "t1", "t2"]);
        assert!(s.undo());
        assert_eq!(ids(&s, "todo"), vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn same_list_moves_once_past_neighbour_center() {
        let mut s = store(&[("todo", &["t1", "t2", "t3"])]);
        let original = s.board().clone();
        let mut c = controller();
        let subject = DragSubject::task("t1", "todo");
        c.start(&mut s, subject.clone()).unwrap();

        // t2's center is y = 110.
        let rects = layout(s.board());
        c.drag_over(&mut s, &at(subject.clone(), 0, 105.0), &rects)
            .unwrap();
        assert_eq!(ids(&s, "todo"), vec!["t1", "t2", "t3"]);

        let rects = layout(s.board());
        c.drag_over(&mut s, &at(subject.clone(), 0, 115.0), &rects)
            .unwrap();
        assert_eq!(ids(&s, "todo"), vec!["t2", "t1", "t3"]);

        // Re-laid out, the pointer now sits on t1's own slot: stays put.
        let rects = layout(s.board());
        c.drag_over(&mut s, &at(subject, 0, 115.0), &rects)
            .unwrap();
        assert_eq!(ids(&s, "todo"), vec!["t2", "t1", "t3"]);

        c.cancel(&mut s);
        assert_eq!(s.board(), &original);
    }

    #[test]
    fn list_drag_only_highlights_until_drop() {
        let mut s = store(&[("a", &[]), ("b", &[])]);
        let mut c = controller();
        let subject = DragSubject::list("a");
        c.start(&mut s, subject.clone()).unwrap();

        let drag = at(subject, 1, 200.0);
        let drops = layout(s.board());
        let over = c.drag_over(&mut s, &drag, &drops).unwrap();
        assert_eq!(over, Some(DragSubject::list("b")));
        let order: Vec<&str> = s.board().lists.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", COMPLETED_LIST_ID]);

        assert_eq!(c.drag_end(&mut s, &drag, &drops), DragOutcome::Committed);
        let order: Vec<&str> = s.board().lists.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(order, vec!["b", "a", COMPLETED_LIST_ID]);
    }

    #[test]
    fn drop_outside_rolls_back_previews() {
        let mut s = store(&[("todo", &["t1"]), ("doing", &["t2"])]);
        let original = s.board().clone();
        let mut c = controller();
        let subject = DragSubject::task("t1", "todo");
        c.start(&mut s, subject.clone()).unwrap();

        let drag = at(subject, 1, 60.0);
        let rects = layout(s.board());
        c.drag_over(&mut s, &drag, &rects).unwrap();
        assert_ne!(s.board(), &original);

        assert_eq!(c.drag_end(&mut s, &drag, &[]), DragOutcome::Cancelled);
        assert_eq!(s.board(), &original);
        assert_eq!(s.revision(), 0);
    }

    #[test]
    fn cancel_behaves_like_drop_outside() {
        let mut s = store(&[("todo", &["t1"]), ("doing", &[])]);
        let original = s.board().clone();
        let mut c = controller();
        let subject = DragSubject::task("t1", "todo");
        c.start(&mut s, subject.clone()).unwrap();
        let rects = layout(s.board());
        c.drag_over(&mut s, &at(subject, 1, 60.0), &rects).unwrap();

        c.cancel(&mut s);
        assert!(!c.is_dragging());
        assert!(!s.is_previewing());
        assert_eq!(s.board(), &original);
    }

    #[test]
    fn failing_frame_is_skipped_and_drag_continues() {
        let mut s = store(&[("todo", &["t1"]), ("doing", &["t2"])]);
        let mut c = controller();
        let subject = DragSubject::task("t1", "todo");
        c.start(&mut s, subject.clone()).unwrap();

        // The dragged card vanishes from the shown board, so this frame's
        // move has nothing to move.
        let mut without = s.board().clone();
        without.lists[0].tasks.clear();
        s.preview(without.clone()).unwrap();

        let drag = at(subject, 1, 60.0);
        let rects = layout(s.board());
        let over = c.drag_over(&mut s, &drag, &rects).unwrap();
        assert_eq!(over, Some(DragSubject::task("t2", "doing")));
        assert!(c.is_dragging());
        assert_eq!(s.board(), &without);

        c.cancel(&mut s);
        assert_eq!(ids(&s, "todo"), vec!["t1"]);
    }

    #[test]
    fn drag_over_without_drag_is_an_error() {
        let mut s = store(&[("todo", &["t1"])]);
        let mut c = controller();
        let drag = at(DragSubject::task("t1", "todo"), 0, 60.0);
        let rects = layout(s.board());
        assert_eq!(
            c.drag_over(&mut s, &drag, &rects),
            Err(SessionError::NotDragging)
        );
        assert_eq!(c.drag_end(&mut s, &drag, &[]), DragOutcome::Cancelled);
    }

    #[test]
    fn dropping_into_completed_stamps_time() {
        let mut s = store(&[("todo", &["t1"])]);
        let mut c = controller();
        let subject = DragSubject::task("t1", "todo");
        c.start(&mut s, subject.clone()).unwrap();
        let drag = at(subject, 1, 60.0);
        let drops = layout(s.board());
        c.drag_over(&mut s, &drag, &drops).unwrap();
        let rects = layout(s.board());
        assert_eq!(c.drag_end(&mut s, &drag, &rects), DragOutcome::Committed);

        let task = s.board().task("t1").unwrap();
        assert_eq!(
            task.completed_at,
            Some(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap())
        );
    }

    #[test]
    fn replacement_is_deferred_until_drag_end() {
        let mut s = store(&[("todo", &["t1", "t2"]), ("doing", &[])]);
        let mut c = controller();

        let mut external = s.board().clone();
        external.lists[0].header = "Renamed".into();
        external.lists[0].tasks.push(Task::with_id("t3", "t3"));

        let subject = DragSubject::task("t1", "todo");
        c.start(&mut s, subject.clone()).unwrap();
        let drag = at(subject, 1, 60.0);
        let rects = layout(s.board());
        c.drag_over(&mut s, &drag, &rects).unwrap();

        assert_eq!(
            c.offer_replacement(&mut s, external),
            Ok(Replacement::Deferred)
        );
        assert_eq!(s.board().lists[0].header, "TODO");

        let drops = layout(s.board());
        assert_eq!(c.drag_end(&mut s, &drag, &drops), DragOutcome::Committed);
        assert_eq!(s.board().lists[0].header, "Renamed");
        assert_eq!(ids(&s, "todo"), vec!["t2", "t3"]);
        assert_eq!(ids(&s, "doing"), vec!["t1"]);
    }

    #[test]
    fn replacement_between_drags_applies_immediately() {
        let mut s = store(&[("todo", &["t1"])]);
        let mut c = controller();
        let same = s.board().clone();
        assert_eq!(c.offer_replacement(&mut s, same), Ok(Replacement::Identical));

        let mut external = s.board().clone();
        external.lists[0].tasks.clear();
        assert_eq!(c.offer_replacement(&mut s, external), Ok(Replacement::Applied));
        assert!(ids(&s, "todo").is_empty());
    }

    #[test]
    fn dragging_completed_list_changes_nothing() {
        let mut s = store(&[("a", &[]), ("b", &[])]);
        let original = s.board().clone();
        let mut c = controller();
        let subject = DragSubject::list(COMPLETED_LIST_ID);
        c.start(&mut s, subject.clone()).unwrap();
        let drag = at(subject, 0, 200.0);
        let drops = layout(s.board());
        c.drag_over(&mut s, &drag, &drops).unwrap();
        assert_eq!(c.drag_end(&mut s, &drag, &drops), DragOutcome::Unchanged);
        assert_eq!(s.board(), &original);
    }
}
