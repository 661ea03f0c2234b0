pub mod autosave;
pub mod board_io;
pub mod config_io;
pub mod watcher;
