use chrono::{DateTime, Utc};

use crate::model::board::Board;
use crate::model::list::{COMPLETED_LIST_ID, TaskList};
use crate::ops::collision::DragSubject;

/// Result of planning a move: either nothing to do, or the next board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovePlan {
    Unchanged,
    Moved(Board),
}

impl MovePlan {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, MovePlan::Unchanged)
    }

    pub fn into_board(self) -> Option<Board> {
        match self {
            MovePlan::Unchanged => None,
            MovePlan::Moved(board) => Some(board),
        }
    }
}

/// Source of `completedAt` timestamps
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Planner bound to a clock. The only impure input is the timestamp.
#[derive(Debug, Clone, Default)]
pub struct MovePlanner<C = SystemClock> {
    clock: C,
}

impl<C: Clock> MovePlanner<C> {
    pub fn new(clock: C) -> Self {
        MovePlanner { clock }
    }

    pub fn plan(&self, board: &Board, draggable: &DragSubject, droppable: &DragSubject) -> MovePlan {
        plan_move(board, draggable, droppable, self.clock.now())
    }

    pub fn complete(&self, board: &Board, task_id: &str, completed_header: &str) -> MovePlan {
        move_task_to_completed(board, task_id, completed_header, self.clock.now())
    }
}

/// Compute the board after dropping `draggable` onto `droppable`.
///
/// Never mutates `board` and never fails: unresolvable ids, moves of the
/// Completed list and moves that land where they started all come back as
/// `MovePlan::Unchanged`.
pub fn plan_move(
    board: &Board,
    draggable: &DragSubject,
    droppable: &DragSubject,
    now: DateTime<Utc>,
) -> MovePlan {
    match draggable {
        DragSubject::List { id } => plan_list_move(board, id, droppable),
        DragSubject::Task { id, .. } => plan_task_move(board, id, droppable, now),
    }
}

/// Index of the list a droppable refers to. Task droppables resolve through
/// the board, so a card that no longer exists resolves to nothing.
fn target_list_index(board: &Board, droppable: &DragSubject) -> Option<usize> {
    match droppable {
        DragSubject::List { id } => board.list_index(id),
        DragSubject::Task { id, .. } => board.find_task(id).map(|loc| loc.list_index),
    }
}

fn plan_list_move(board: &Board, list_id: &str, droppable: &DragSubject) -> MovePlan {
    if list_id == COMPLETED_LIST_ID {
        return MovePlan::Unchanged;
    }
    let (Some(from), Some(to)) = (board.list_index(list_id), target_list_index(board, droppable))
    else {
        return MovePlan::Unchanged;
    };
    if from == to {
        return MovePlan::Unchanged;
    }

    let mut lists = board.lists.clone();
    let moved = lists.remove(from);
    let mut insert_at = to.min(lists.len());
    if let Some(completed) = lists.iter().position(TaskList::is_completed) {
        insert_at = insert_at.min(completed);
    }
    lists.insert(insert_at, moved);

    if lists == board.lists {
        return MovePlan::Unchanged;
    }
    tracing::debug!(list = list_id, from, to = insert_at, "planned list move");
    MovePlan::Moved(Board::new(lists))
}

fn plan_task_move(
    board: &Board,
    task_id: &str,
    droppable: &DragSubject,
    now: DateTime<Utc>,
) -> MovePlan {
    if let DragSubject::Task { id, .. } = droppable
        && id == task_id
    {
        return MovePlan::Unchanged;
    }
    let (Some(source), Some(target_list)) =
        (board.find_task(task_id), target_list_index(board, droppable))
    else {
        return MovePlan::Unchanged;
    };
    let same_list = source.list_index == target_list;

    // Slot the task should occupy once it is back in the target list.
    let insert_at = match droppable {
        DragSubject::List { .. } => {
            let len = board.lists[target_list].tasks.len();
            if same_list { len - 1 } else { len }
        }
        DragSubject::Task { id, .. } => match board.lists[target_list].position_of(id) {
            Some(idx) => idx,
            None => return MovePlan::Unchanged,
        },
    };
    if same_list && insert_at == source.task_index {
        return MovePlan::Unchanged;
    }

    let mut next = board.clone();
    let mut task = next.lists[source.list_index]
        .tasks
        .remove(source.task_index);

    if !same_list {
        let into_completed = next.lists[target_list].is_completed();
        let out_of_completed = next.lists[source.list_index].is_completed();
        if into_completed {
            task.completed_at = Some(now);
        } else if out_of_completed {
            task.completed_at = None;
        }
    }

    tracing::debug!(
        task = task_id,
        from_list = %board.lists[source.list_index].id,
        to_list = %board.lists[target_list].id,
        from = source.task_index,
        to = insert_at,
        "planned task move"
    );
    next.lists[target_list].tasks.insert(insert_at, task);
    MovePlan::Moved(next)
}

/// Move a task to the top of the Completed list and stamp it, creating the
/// Completed list at the end of the board if it does not exist yet.
pub fn move_task_to_completed(
    board: &Board,
    task_id: &str,
    completed_header: &str,
    now: DateTime<Utc>,
) -> MovePlan {
    let Some(source) = board.find_task(task_id) else {
        return MovePlan::Unchanged;
    };
    if board.lists[source.list_index].is_completed() {
        return MovePlan::Unchanged;
    }

    let mut next = board.clone();
    let mut task = next.lists[source.list_index]
        .tasks
        .remove(source.task_index);
    task.completed_at = Some(now);

    let completed = match next.completed_index() {
        Some(idx) => idx,
        None => {
            next.lists.push(TaskList::completed(completed_header));
            next.lists.len() - 1
        }
    };
    next.lists[completed].tasks.insert(0, task);
    MovePlan::Moved(next)
}

/// Where a newly added list goes: right before Completed, else at the end.
pub fn insert_index_for_new_list(lists: &[TaskList]) -> usize {
    lists
        .iter()
        .position(TaskList::is_completed)
        .unwrap_or(lists.len())
}
