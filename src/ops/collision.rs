//! Drop-target resolution for board drags.
//!
//! Lists resolve against lists only. Tasks resolve in two phases: first the
//! closest list, then the closest task inside that list. A flat nearest-task
//! search would let a card jump into a neighbouring column whenever a card
//! there happens to sit closer than anything in the column under the pointer.

use serde::{Deserialize, Serialize};

/// What is being dragged, or what is being dropped onto
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DragSubject {
    /// A whole list ("group")
    List { id: String },
    /// A task ("item"), annotated with the list it currently belongs to
    Task { id: String, list_id: String },
}

impl DragSubject {
    pub fn list(id: impl Into<String>) -> Self {
        DragSubject::List { id: id.into() }
    }

    pub fn task(id: impl Into<String>, list_id: impl Into<String>) -> Self {
        DragSubject::Task {
            id: id.into(),
            list_id: list_id.into(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            DragSubject::List { id } | DragSubject::Task { id, .. } => id,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, DragSubject::List { .. })
    }

    /// The list this subject is, or belongs to
    pub fn group(&self) -> &str {
        match self {
            DragSubject::List { id } => id,
            DragSubject::Task { list_id, .. } => list_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn distance_squared(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Axis-aligned bounding box in layout coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// A drop candidate with its current layout
#[derive(Debug, Clone, PartialEq)]
pub struct Droppable {
    pub subject: DragSubject,
    pub rect: Rect,
}

impl Droppable {
    pub fn new(subject: DragSubject, rect: Rect) -> Self {
        Droppable { subject, rect }
    }
}

/// The dragged subject and where it currently is on screen
#[derive(Debug, Clone, PartialEq)]
pub struct Draggable {
    pub subject: DragSubject,
    pub rect: Rect,
}

impl Draggable {
    pub fn new(subject: DragSubject, rect: Rect) -> Self {
        Draggable { subject, rect }
    }
}

/// Candidate whose center is closest to `origin`. Ties go to the first one.
pub fn closest_center<'a, I>(origin: Point, candidates: I) -> Option<&'a Droppable>
where
    I: IntoIterator<Item = &'a Droppable>,
{
    let mut best: Option<(&Droppable, f64)> = None;
    for candidate in candidates {
        let distance = origin.distance_squared(candidate.rect.center());
        match best {
            Some((_, d)) if d <= distance => {}
            _ => best = Some((candidate, distance)),
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// Resolve the single best drop target for a drag, or `None` if nothing
/// qualifies.
pub fn detect_collision<'a>(
    draggable: &Draggable,
    droppables: &'a [Droppable],
) -> Option<&'a Droppable> {
    let origin = draggable.rect.center();
    let closest_list = closest_center(origin, droppables.iter().filter(|d| d.subject.is_list()))?;

    let (dragged_id, origin_list) = match &draggable.subject {
        DragSubject::List { .. } => return Some(closest_list),
        DragSubject::Task { id, list_id } => (id.as_str(), list_id.as_str()),
    };

    let target_list = closest_list.subject.id();
    let in_list = || {
        droppables.iter().filter(move |d| match &d.subject {
            DragSubject::Task { id, list_id } => list_id == target_list && id != dragged_id,
            DragSubject::List { .. } => false,
        })
    };

    let Some(closest_task) = closest_center(origin, in_list()) else {
        return Some(closest_list);
    };

    // Entering another list below its last card appends instead of
    // flickering between "before last" and "end".
    if origin_list != target_list {
        let last = in_list().reduce(|a, b| {
            if b.rect.center().y > a.rect.center().y {
                b
            } else {
                a
            }
        });
        if last.is_some_and(|last| last.subject == closest_task.subject)
            && origin.y > closest_task.rect.center().y
        {
            return Some(closest_list);
        }
    }

    Some(closest_task)
}
