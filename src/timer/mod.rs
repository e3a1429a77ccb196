//! Locked task timer module
//!
//! This module contains the wall-clock anchored timer, the clock abstraction
//! it reads time from, and the record it persists between runs.

pub mod clock;
pub mod record;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use record::{TaskId, TimerRecord};
pub use service::{elapsed_between, CompletionCallback, TickOutcome, TimerService};
