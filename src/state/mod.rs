//! State management module
//!
//! This module contains the task log, the timer snapshot exposed to clients,
//! and the application state that ties them together.

pub mod app_state;
pub mod task_log;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use task_log::{Category, EntryFields, LogEntry, TaskLog, TaskStatus, ValueTag};
pub use timer_state::TimerSnapshot;
