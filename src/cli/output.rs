use indexmap::IndexMap;

use crate::model::board::Board;
use crate::model::list::TaskList;
use crate::model::task::{Tag, Task};

/// Ids are shown shortened unless asked for in full
pub const SHORT_ID_LEN: usize = 7;

pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

/// `1800` → `30m`, `5400` → `1h30m`
pub fn format_duration(seconds: u64) -> String {
    let minutes = seconds / 60;
    let (h, m) = (minutes / 60, minutes % 60);
    match (h, m) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h{:02}m", h, m),
    }
}

/// Format a single task as a one-line summary
pub fn format_task_line(task: &Task, full_ids: bool) -> String {
    let id = if full_ids { task.id.as_str() } else { short_id(&task.id) };
    let mut line = format!("[{}] {}", id, task.header);
    if task.is_draft {
        line.push_str("  (draft)");
    }
    if let Some(priority) = task.priority {
        line.push_str(&format!("  !{}", priority));
    }
    if !task.tags.is_empty() {
        let tags = task
            .tags
            .iter()
            .map(|t| format!("#{}", t.label))
            .collect::<Vec<_>>()
            .join(" ");
        line.push_str(&format!("  {}", tags));
    }
    if let Some(estimate) = task.estimated_seconds {
        line.push_str(&format!("  ~{}", format_duration(estimate)));
    }
    if let Some(due) = task.due_date {
        line.push_str(&format!("  due {}", due.format("%Y-%m-%d")));
    }
    if let Some(done) = task.completed_at {
        line.push_str(&format!("  done {}", done.format("%Y-%m-%d")));
    }
    line
}

/// Format a list header followed by its tasks
pub fn format_list(list: &TaskList, full_ids: bool) -> Vec<String> {
    let id = if full_ids { list.id.as_str() } else { short_id(&list.id) };
    let mut lines = vec![format!("== {} ({}) ==", list.header, id)];
    if list.tasks.is_empty() {
        lines.push("  (empty)".to_string());
    }
    for task in &list.tasks {
        lines.push(format!("  {}", format_task_line(task, full_ids)));
    }
    lines
}

pub fn format_board(board: &Board, full_ids: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, list) in board.lists.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.extend(format_list(list, full_ids));
    }
    lines
}

pub fn format_tags(tags: &IndexMap<String, Tag>) -> Vec<String> {
    tags.values()
        .map(|tag| format!("#{}  {}", tag.label, tag.color))
        .collect()
}
