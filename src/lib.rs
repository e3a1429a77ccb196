//! Focus Mirror - a local time-and-focus tracker
//!
//! Tasks are logged with a duration, category, focus level and perceived
//! value. One task at a time can be locked into a countdown timer whose
//! progress is anchored to the wall clock and survives restarts.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod state;
pub mod storage;
pub mod tasks;
pub mod timer;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use state::AppState;
pub use timer::{TaskId, TimerService};
pub use utils::signals::shutdown_signal;
