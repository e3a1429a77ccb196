//! Timer state structure exposed to the presentation layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TaskId;

/// Read-only view of the locked task timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub active_task_id: Option<TaskId>,
    pub is_locked: bool,
    pub elapsed_seconds: u64,
    pub duration_seconds: Option<u64>,
    pub remaining_seconds: Option<u64>,
    pub started_at: Option<DateTime<Utc>>,
    /// Whether a completion callback is connected to the current activation
    pub completion_attached: bool,
}

impl TimerSnapshot {
    /// Create an idle snapshot
    pub fn idle() -> Self {
        Self {
            active_task_id: None,
            is_locked: false,
            elapsed_seconds: 0,
            duration_seconds: None,
            remaining_seconds: None,
            started_at: None,
            completion_attached: false,
        }
    }

    /// Fraction of the target duration already elapsed, capped at 1.0
    pub fn progress(&self) -> Option<f64> {
        match self.duration_seconds {
            Some(0) => Some(1.0),
            Some(duration) => Some((self.elapsed_seconds as f64 / duration as f64).min(1.0)),
            None => None,
        }
    }
}

impl Default for TimerSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}
