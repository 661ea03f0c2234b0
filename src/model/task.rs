use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::generate_id;

/// Color used for tags created from a bare label
pub const DEFAULT_TAG_COLOR: &str = "#3b82f6";

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority '{other}': use low, medium, high")),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A colored label attached to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub label: String,
    /// Hex color like `#RGB` or `#RRGGBB`
    pub color: String,
}

impl Tag {
    /// Tag with the default color
    pub fn new(label: impl Into<String>) -> Self {
        Tag {
            label: label.into(),
            color: DEFAULT_TAG_COLOR.to_string(),
        }
    }
}

/// One timer run recorded against a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLog {
    pub start: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// Timer mode the run was recorded in (e.g. `focus`, `break`)
    pub kind: String,
}

/// A single task card.
///
/// Everything except `id` and `completed_at` is payload the board core only
/// carries along. `completed_at` is owned by the move planner: it is stamped
/// when the task lands in the Completed list and cleared when it leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub header: String,
    #[serde(default)]
    pub is_draft: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_logs: Vec<TimeLog>,
    /// Rich-text body. Stored in its own file, not in the board JSON.
    #[serde(skip)]
    pub content: Option<String>,
}

impl Task {
    /// Create a task with a freshly generated id
    pub fn new(header: impl Into<String>) -> Self {
        Self::with_id(generate_id(), header)
    }

    /// Create a task with a caller-chosen id
    pub fn with_id(id: impl Into<String>, header: impl Into<String>) -> Self {
        Task {
            id: id.into(),
            header: header.into(),
            is_draft: false,
            created_at: Utc::now(),
            due_date: None,
            completed_at: None,
            priority: None,
            description: None,
            tags: Vec::new(),
            estimated_seconds: None,
            time_spent_seconds: None,
            time_logs: Vec::new(),
            content: None,
        }
    }

    /// Total seconds across closed time logs; open logs count as zero.
    pub fn logged_seconds(&self) -> u64 {
        self.time_logs
            .iter()
            .map(|log| match log.end {
                Some(end) => (end - log.start).num_seconds().max(0) as u64,
                None => 0,
            })
            .sum()
    }
}

/// Partial update applied through the store's `update_task`.
///
/// `None` leaves a field untouched. Nullable fields use a nested `Option` so
/// they can be cleared. `completed_at` is deliberately absent.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub header: Option<String>,
    pub is_draft: Option<bool>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub priority: Option<Option<Priority>>,
    pub description: Option<Option<String>>,
    pub tags: Option<Vec<Tag>>,
    pub estimated_seconds: Option<Option<u64>>,
    pub time_logs: Option<Vec<TimeLog>>,
    pub content: Option<Option<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.header.is_none()
            && self.is_draft.is_none()
            && self.due_date.is_none()
            && self.priority.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.estimated_seconds.is_none()
            && self.time_logs.is_none()
            && self.content.is_none()
    }

    /// Apply to a task. Returns true if any field changed.
    pub fn apply(self, task: &mut Task) -> bool {
        let before = task.clone();
        if let Some(header) = self.header {
            task.header = header.trim().to_string();
        }
        if let Some(is_draft) = self.is_draft {
            task.is_draft = is_draft;
        }
        if let Some(due) = self.due_date {
            task.due_date = due;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(tags) = self.tags {
            task.tags = tags;
        }
        if let Some(estimate) = self.estimated_seconds {
            task.estimated_seconds = estimate;
        }
        if let Some(logs) = self.time_logs {
            task.time_logs = logs;
            task.time_spent_seconds = Some(task.logged_seconds());
        }
        if let Some(content) = self.content {
            task.content = content;
        }
        *task != before
    }
}
