//! API request and response structures

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{state::TimerSnapshot, timer::TaskId};

/// API response structure for timer transition endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: TimerSnapshot,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: &str, message: String, timer: TimerSnapshot) -> Self {
        Self {
            status: status.to_string(),
            message,
            timestamp: Utc::now(),
            timer,
        }
    }

    pub fn started(message: String, timer: TimerSnapshot) -> Self {
        Self::new("started", message, timer)
    }

    /// Start was ignored because another task holds the lock
    pub fn locked(message: String, timer: TimerSnapshot) -> Self {
        Self::new("locked", message, timer)
    }

    pub fn stopped(message: String, timer: TimerSnapshot) -> Self {
        Self::new("stopped", message, timer)
    }

    pub fn idle(message: String, timer: TimerSnapshot) -> Self {
        Self::new("idle", message, timer)
    }
}

/// Body of `GET /timer`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerResponse {
    #[serde(flatten)]
    pub timer: TimerSnapshot,
    /// Fraction of the duration already elapsed
    pub progress: Option<f64>,
}

impl From<TimerSnapshot> for TimerResponse {
    fn from(timer: TimerSnapshot) -> Self {
        Self {
            progress: timer.progress(),
            timer,
        }
    }
}

/// Error body returned alongside a non-2xx status code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(message: String) -> Self {
        Self {
            status: "error".to_string(),
            message,
            timestamp: Utc::now(),
        }
    }
}

/// Body of `POST /timer/start`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartTimerRequest {
    pub task_id: TaskId,
    /// Overrides the duration logged with the task
    #[serde(default)]
    pub duration_seconds: Option<u64>,
}

/// Query of `GET /dashboard/heatmap`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeatmapQuery {
    pub days: Option<u32>,
}

/// Query of `GET /calendar/week`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarQuery {
    /// Any day of the week to show; defaults to today
    pub start: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub removed: usize,
}

/// Status response with timer and task log information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub timer: TimerSnapshot,
    pub pending_tasks: usize,
    pub completed_tasks: usize,
    pub uptime: String,
    pub port: u16,
    pub host: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
