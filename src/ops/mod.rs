pub mod collision;
pub mod history;
pub mod plan;
