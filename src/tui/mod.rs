//! Terminal user interface.

pub mod app;
pub mod backend;
pub mod compose;
pub mod messages;
pub mod sidebar;
pub mod ui;

pub use app::run;
