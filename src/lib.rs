//! Kanban board core: lists of tasks, drag-and-drop move planning, and the
//! store, persistence and autosave around them.

pub mod app;
pub mod cli;
pub mod dnd;
pub mod io;
pub mod model;
pub mod ops;
pub mod store;
