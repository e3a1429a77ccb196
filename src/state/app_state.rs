//! Main application state management

use std::{fmt, sync::Arc, time::Instant};

use tracing::{info, warn};

use super::{EntryFields, LogEntry, TaskLog};
use crate::{
    error::LogError,
    storage::KeyValueStore,
    timer::{Clock, TaskId, TimerService},
};

/// Main application state tying the task log to the locked task timer
pub struct AppState {
    pub timer: Arc<TimerService>,
    pub logs: Arc<TaskLog>,
    pub clock: Arc<dyn Clock>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
}

impl AppState {
    /// Load persisted state and reconnect a timer that survived a restart
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        port: u16,
        host: String,
    ) -> Self {
        let logs = Arc::new(TaskLog::load(Arc::clone(&store)));
        let timer = Arc::new(TimerService::restore(store, Arc::clone(&clock)));

        let state = Self {
            timer,
            logs,
            clock,
            start_time: Instant::now(),
            port,
            host,
        };
        state.reattach_restored();
        state
    }

    /// Callback that moves `task_id` to completed when its timer runs out
    fn completion_for(&self, task_id: TaskId) -> impl FnOnce() + Send + 'static {
        let logs = Arc::clone(&self.logs);
        let clock = Arc::clone(&self.clock);
        move || match logs.mark_completed(&task_id, clock.now()) {
            Ok(entry) => info!("Task {} ({}) marked completed", entry.id, entry.task),
            Err(e) => warn!("Failed to mark task {} completed: {}", task_id, e),
        }
    }

    /// Reconnect the completion callback of a restored timer to its log entry.
    ///
    /// A restored timer whose task no longer exists is stopped.
    pub fn reattach_restored(&self) -> bool {
        let Some(task_id) = self.timer.active_task_id() else {
            return false;
        };
        let Some(entry) = self.logs.get(&task_id) else {
            warn!("Restored timer refers to unknown task {}, stopping it", task_id);
            self.timer.stop_timer();
            return false;
        };

        let duration = match self.timer.snapshot().duration_seconds {
            Some(_) => None,
            None => Some(entry.duration_seconds()),
        };
        let callback = self.completion_for(task_id.clone());
        self.timer.reattach(&task_id, duration, callback)
    }

    /// Start the timer for a logged task.
    ///
    /// Returns `Ok(false)` if another task is already locked.
    pub fn start_task(
        &self,
        task_id: &TaskId,
        duration_override: Option<u64>,
    ) -> Result<bool, LogError> {
        let entry = self
            .logs
            .get(task_id)
            .ok_or_else(|| LogError::NotFound(task_id.to_string()))?;
        if entry.is_completed() {
            return Err(LogError::Invalid(format!("task {} is already completed", task_id)));
        }

        let duration = duration_override.unwrap_or_else(|| entry.duration_seconds());
        let callback = self.completion_for(task_id.clone());
        Ok(self.timer.start_timer(task_id.clone(), duration, callback))
    }

    pub fn add_entry(&self, fields: EntryFields) -> Result<LogEntry, LogError> {
        self.logs.add(fields, self.clock.now())
    }

    /// Delete an entry; deleting the locked task aborts its timer first
    pub fn delete_entry(&self, task_id: &TaskId) -> Result<LogEntry, LogError> {
        if self.timer.active_task_id().as_ref() == Some(task_id) {
            info!("Deleting locked task {}, stopping its timer", task_id);
            self.timer.stop_timer();
        }
        self.logs.delete(task_id)
    }

    /// Remove all entries and abort any running timer
    pub fn clear_entries(&self) -> Result<usize, LogError> {
        if self.timer.is_locked() {
            self.timer.stop_timer();
        }
        self.logs.clear()
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        format_uptime(self.start_time.elapsed().as_secs())
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("timer", &self.timer)
            .field("entries", &self.logs.len())
            .field("port", &self.port)
            .field("host", &self.host)
            .finish()
    }
}

fn format_uptime(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        state::{Category, TaskStatus, ValueTag},
        storage::{MemoryStore, TIMER_KEY},
        timer::{ManualClock, TickOutcome},
    };

    fn fields(minutes: u32) -> EntryFields {
        EntryFields {
            task: "Deep work".to_string(),
            duration_minutes: minutes,
            category: Category::Creative,
            focus: 4,
            value: ValueTag::High,
            start: None,
        }
    }

    fn setup() -> (Arc<MemoryStore>, Arc<ManualClock>, AppState) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0).unwrap()));
        let state = AppState::new(store.clone(), clock.clone(), 0, "127.0.0.1".to_string());
        (store, clock, state)
    }

    #[test]
    fn natural_completion_marks_the_entry_completed() {
        let (_, clock, state) = setup();
        let entry = state.add_entry(fields(1)).unwrap();

        assert!(state.start_task(&entry.id, None).unwrap());
        assert_eq!(state.timer.snapshot().duration_seconds, Some(60));

        clock.advance_secs(60);
        assert_eq!(
            state.timer.tick(),
            TickOutcome::Completed { task_id: entry.id.clone() }
        );
        let done = state.logs.get(&entry.id).unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.completed_at, Some(clock.now()));
    }

    #[test]
    fn second_task_cannot_preempt() {
        let (_, _, state) = setup();
        let a = state.add_entry(fields(10)).unwrap();
        let b = state.add_entry(fields(10)).unwrap();

        assert!(state.start_task(&a.id, None).unwrap());
        assert!(!state.start_task(&b.id, Some(5)).unwrap());
        assert_eq!(state.timer.active_task_id(), Some(a.id));
    }

    #[test]
    fn unknown_and_completed_tasks_cannot_start() {
        let (_, _, state) = setup();
        assert!(matches!(
            state.start_task(&TaskId::from("nope"), None),
            Err(LogError::NotFound(_))
        ));

        let entry = state.add_entry(fields(1)).unwrap();
        state.logs.mark_completed(&entry.id, state.clock.now()).unwrap();
        assert!(matches!(state.start_task(&entry.id, None), Err(LogError::Invalid(_))));
        assert!(!state.timer.is_locked());
    }

    #[test]
    fn restart_reconnects_completion() {
        let (store, clock, state) = setup();
        let entry = state.add_entry(fields(2)).unwrap();
        state.start_task(&entry.id, None).unwrap();
        drop(state);

        clock.advance_secs(3 * 60);
        let restarted = AppState::new(store.clone(), clock.clone(), 0, "127.0.0.1".to_string());
        assert_eq!(restarted.timer.elapsed_seconds(), 180);
        assert!(restarted.timer.snapshot().completion_attached);

        assert!(matches!(restarted.timer.tick(), TickOutcome::Completed { .. }));
        assert!(restarted.logs.get(&entry.id).unwrap().is_completed());
        assert_eq!(store.get(TIMER_KEY).unwrap(), None);
    }

    #[test]
    fn restored_timer_for_a_deleted_task_is_stopped() {
        let (store, clock, state) = setup();
        let entry = state.add_entry(fields(2)).unwrap();
        state.start_task(&entry.id, None).unwrap();
        let persisted = store.get(TIMER_KEY).unwrap().unwrap();
        state.logs.delete(&entry.id).unwrap();
        store.set(TIMER_KEY, &persisted).unwrap();
        drop(state);

        let restarted = AppState::new(store.clone(), clock, 0, "127.0.0.1".to_string());
        assert!(!restarted.timer.is_locked());
        assert_eq!(store.get(TIMER_KEY).unwrap(), None);
    }

    #[test]
    fn deleting_the_locked_task_aborts_without_completing() {
        let (_, clock, state) = setup();
        let entry = state.add_entry(fields(1)).unwrap();
        let other = state.add_entry(fields(1)).unwrap();
        state.start_task(&entry.id, None).unwrap();

        state.delete_entry(&other.id).unwrap();
        assert!(state.timer.is_locked());

        state.delete_entry(&entry.id).unwrap();
        assert!(!state.timer.is_locked());
        clock.advance_secs(120);
        assert_eq!(state.timer.tick(), TickOutcome::Idle);
    }

    #[test]
    fn clearing_stops_the_timer() {
        let (_, _, state) = setup();
        let entry = state.add_entry(fields(1)).unwrap();
        state.start_task(&entry.id, None).unwrap();

        assert_eq!(state.clear_entries().unwrap(), 1);
        assert!(!state.timer.is_locked());
    }

    #[test]
    fn uptime_formatting() {
        assert_eq!(format_uptime(5), "5s");
        assert_eq!(format_uptime(65), "1m 5s");
        assert_eq!(format_uptime(3_725), "1h 2m 5s");
    }
}
