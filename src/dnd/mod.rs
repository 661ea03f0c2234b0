pub mod session;

pub use session::{DragController, DragOutcome, Replacement, SessionError};
