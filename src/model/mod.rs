pub mod board;
pub mod config;
pub mod id;
pub mod list;
pub mod task;

pub use board::*;
pub use config::*;
pub use id::*;
pub use list::*;
pub use task::*;
