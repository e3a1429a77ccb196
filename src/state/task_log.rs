//! Task log: the list of logged tasks and their completion status

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    error::LogError,
    storage::{KeyValueStore, LOGS_KEY},
    timer::TaskId,
};

/// What kind of work a task was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Study,
    #[serde(rename = "Job Search")]
    JobSearch,
    Passive,
    Creative,
    Fitness,
    Admin,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Study,
        Category::JobSearch,
        Category::Passive,
        Category::Creative,
        Category::Fitness,
        Category::Admin,
        Category::Other,
    ];
}

/// How valuable the time felt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueTag {
    High,
    Medium,
    Low,
}

impl ValueTag {
    pub fn score(self) -> u8 {
        match self {
            ValueTag::High => 3,
            ValueTag::Medium => 2,
            ValueTag::Low => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

pub const MIN_FOCUS: u8 = 1;
pub const MAX_FOCUS: u8 = 5;
/// A task may be planned for at most one day
pub const MAX_DURATION_MINUTES: u32 = 24 * 60;

/// A logged task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: TaskId,
    pub task: String,
    pub duration_minutes: u32,
    pub category: Category,
    pub focus: u8,
    pub value: ValueTag,
    #[serde(default)]
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// When the task is scheduled on the calendar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
}

impl LogEntry {
    /// Target duration of the task's timer
    pub fn duration_seconds(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// The user-editable fields of an entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryFields {
    pub task: String,
    pub duration_minutes: u32,
    pub category: Category,
    pub focus: u8,
    pub value: ValueTag,
    /// Only taken when the entry is created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
}

impl EntryFields {
    fn validate(mut self) -> Result<Self, LogError> {
        self.task = self.task.trim().to_string();
        if self.task.is_empty() {
            return Err(LogError::Invalid("task name must not be empty".to_string()));
        }
        if !(1..=MAX_DURATION_MINUTES).contains(&self.duration_minutes) {
            return Err(LogError::Invalid(format!(
                "duration must be between 1 and {} minutes",
                MAX_DURATION_MINUTES
            )));
        }
        if !(MIN_FOCUS..=MAX_FOCUS).contains(&self.focus) {
            return Err(LogError::Invalid(format!(
                "focus must be between {} and {}",
                MIN_FOCUS, MAX_FOCUS
            )));
        }
        Ok(self)
    }
}

/// Persisted list of logged tasks
pub struct TaskLog {
    entries: Mutex<Vec<LogEntry>>,
    store: Arc<dyn KeyValueStore>,
}

impl TaskLog {
    /// Load the log from the store; a missing or unreadable list is empty
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let entries = match store.get(LOGS_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<Vec<LogEntry>>(&raw).unwrap_or_else(|e| {
                warn!("Discarding unreadable task log: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read task log: {}", e);
                Vec::new()
            }
        };
        info!("Loaded {} logged tasks", entries.len());

        Self {
            entries: Mutex::new(entries),
            store,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `update` to a copy of the entries and commit it only once it is stored
    fn mutate<T, F>(&self, update: F) -> Result<T, LogError>
    where
        F: FnOnce(&mut Vec<LogEntry>) -> Result<T, LogError>,
    {
        let mut entries = self.lock();
        let mut next = entries.clone();
        let result = update(&mut next)?;

        let raw = serde_json::to_string(&next).map_err(crate::error::StoreError::from)?;
        self.store.set(LOGS_KEY, &raw)?;
        *entries = next;
        Ok(result)
    }

    pub fn list(&self) -> Vec<LogEntry> {
        self.lock().clone()
    }

    pub fn get(&self, id: &TaskId) -> Option<LogEntry> {
        self.lock().iter().find(|e| &e.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Count of (pending, completed) entries
    pub fn counts(&self) -> (usize, usize) {
        let entries = self.lock();
        let completed = entries.iter().filter(|e| e.is_completed()).count();
        (entries.len() - completed, completed)
    }

    /// Add a pending entry created at `now`
    pub fn add(&self, fields: EntryFields, now: DateTime<Utc>) -> Result<LogEntry, LogError> {
        let fields = fields.validate()?;
        let entry = self.mutate(|entries| {
            let entry = LogEntry {
                id: next_id(entries, now),
                task: fields.task,
                duration_minutes: fields.duration_minutes,
                category: fields.category,
                focus: fields.focus,
                value: fields.value,
                status: TaskStatus::Pending,
                created_at: now,
                completed_at: None,
                start: fields.start,
            };
            entries.push(entry.clone());
            Ok(entry)
        })?;
        info!("Logged task {} ({})", entry.id, entry.task);
        Ok(entry)
    }

    /// Replace the editable fields of an entry, keeping its id, status,
    /// timestamps and scheduled start
    pub fn update(&self, id: &TaskId, fields: EntryFields) -> Result<LogEntry, LogError> {
        let fields = fields.validate()?;
        self.mutate(|entries| {
            let entry = find_mut(entries, id)?;
            entry.task = fields.task;
            entry.duration_minutes = fields.duration_minutes;
            entry.category = fields.category;
            entry.focus = fields.focus;
            entry.value = fields.value;
            Ok(entry.clone())
        })
    }

    pub fn delete(&self, id: &TaskId) -> Result<LogEntry, LogError> {
        let removed = self.mutate(|entries| {
            let index = entries
                .iter()
                .position(|e| &e.id == id)
                .ok_or_else(|| LogError::NotFound(id.to_string()))?;
            Ok(entries.remove(index))
        })?;
        info!("Deleted task {}", id);
        Ok(removed)
    }

    /// Remove every entry, returning how many were removed
    pub fn clear(&self) -> Result<usize, LogError> {
        let removed = self.mutate(|entries| Ok(std::mem::take(entries).len()))?;
        info!("Cleared {} logged tasks", removed);
        Ok(removed)
    }

    /// Move an entry from pending to completed. Completing twice keeps the
    /// first completion time.
    pub fn mark_completed(&self, id: &TaskId, at: DateTime<Utc>) -> Result<LogEntry, LogError> {
        self.mutate(|entries| {
            let entry = find_mut(entries, id)?;
            if entry.is_completed() {
                debug!("Task {} already completed", id);
            } else {
                entry.status = TaskStatus::Completed;
                entry.completed_at = Some(at);
            }
            Ok(entry.clone())
        })
    }
}

fn find_mut<'a>(entries: &'a mut [LogEntry], id: &TaskId) -> Result<&'a mut LogEntry, LogError> {
    entries
        .iter_mut()
        .find(|e| &e.id == id)
        .ok_or_else(|| LogError::NotFound(id.to_string()))
}

/// Ids are creation times in epoch milliseconds, bumped past any collision
fn next_id(entries: &[LogEntry], now: DateTime<Utc>) -> TaskId {
    let mut candidate = now.timestamp_millis();
    while entries.iter().any(|e| e.id.as_str() == candidate.to_string()) {
        candidate += 1;
    }
    TaskId::new(candidate.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::storage::MemoryStore;

    fn fields(task: &str) -> EntryFields {
        EntryFields {
            task: task.to_string(),
            duration_minutes: 45,
            category: Category::Study,
            focus: 3,
            value: ValueTag::Medium,
            start: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    #[test]
    fn add_persists_and_reloads() {
        let store = Arc::new(MemoryStore::new());
        let log = TaskLog::load(store.clone());
        let entry = log.add(fields("  Calculus review "), now()).unwrap();

        assert_eq!(entry.task, "Calculus review");
        assert_eq!(entry.id.as_str(), now().timestamp_millis().to_string());
        assert_eq!(entry.status, TaskStatus::Pending);
        assert_eq!(entry.duration_seconds(), 2_700);

        let reloaded = TaskLog::load(store);
        assert_eq!(reloaded.list(), vec![entry]);
    }

    #[test]
    fn ids_stay_unique_within_one_millisecond() {
        let log = TaskLog::load(Arc::new(MemoryStore::new()));
        let a = log.add(fields("a"), now()).unwrap();
        let b = log.add(fields("b"), now()).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn invalid_fields_are_rejected() {
        let log = TaskLog::load(Arc::new(MemoryStore::new()));

        let mut empty = fields("   ");
        assert!(matches!(log.add(empty.clone(), now()), Err(LogError::Invalid(_))));

        empty.task = "x".to_string();
        empty.duration_minutes = 0;
        assert!(matches!(log.add(empty.clone(), now()), Err(LogError::Invalid(_))));

        empty.duration_minutes = MAX_DURATION_MINUTES + 1;
        assert!(matches!(log.add(empty.clone(), now()), Err(LogError::Invalid(_))));

        empty.duration_minutes = 5;
        empty.focus = 6;
        assert!(matches!(log.add(empty, now()), Err(LogError::Invalid(_))));
        assert!(log.is_empty());
    }

    #[test]
    fn update_keeps_identity() {
        let log = TaskLog::load(Arc::new(MemoryStore::new()));
        let entry = log.add(fields("draft"), now()).unwrap();

        let mut edited = fields("final");
        edited.category = Category::JobSearch;
        edited.value = ValueTag::High;
        let updated = log.update(&entry.id, edited).unwrap();

        assert_eq!(updated.id, entry.id);
        assert_eq!(updated.created_at, entry.created_at);
        assert_eq!(updated.task, "final");
        assert_eq!(updated.category, Category::JobSearch);
        assert!(matches!(
            log.update(&TaskId::from("missing"), fields("x")),
            Err(LogError::NotFound(_))
        ));
    }

    #[test]
    fn a_full_day_is_the_longest_duration() {
        let log = TaskLog::load(Arc::new(MemoryStore::new()));
        let mut day = fields("marathon");
        day.duration_minutes = MAX_DURATION_MINUTES;
        assert_eq!(log.add(day, now()).unwrap().duration_seconds(), 86_400);
    }

    #[test]
    fn update_keeps_the_scheduled_start() {
        let log = TaskLog::load(Arc::new(MemoryStore::new()));
        let slot = Utc.with_ymd_and_hms(2026, 3, 4, 14, 0, 0).unwrap();
        let mut scheduled = fields("review");
        scheduled.start = Some(slot);
        let entry = log.add(scheduled, now()).unwrap();
        assert_eq!(entry.start, Some(slot));

        let mut moved = fields("review notes");
        moved.start = Some(slot + chrono::Duration::days(1));
        let updated = log.update(&entry.id, moved).unwrap();
        assert_eq!(updated.start, Some(slot));
        assert_eq!(updated.task, "review notes");

        let unscheduled = log.add(fields("someday"), now()).unwrap();
        assert_eq!(unscheduled.start, None);
        let json = serde_json::to_value(&unscheduled).unwrap();
        assert!(json.get("start").is_none());
    }

    #[test]
    fn mark_completed_is_idempotent() {
        let log = TaskLog::load(Arc::new(MemoryStore::new()));
        let entry = log.add(fields("run"), now()).unwrap();

        let first = now() + chrono::Duration::minutes(45);
        let done = log.mark_completed(&entry.id, first).unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.completed_at, Some(first));

        let again = log
            .mark_completed(&entry.id, first + chrono::Duration::hours(1))
            .unwrap();
        assert_eq!(again.completed_at, Some(first));
        assert_eq!(log.counts(), (0, 1));
    }

    #[test]
    fn delete_and_clear() {
        let log = TaskLog::load(Arc::new(MemoryStore::new()));
        let a = log.add(fields("a"), now()).unwrap();
        log.add(fields("b"), now()).unwrap();
        log.add(fields("c"), now()).unwrap();

        assert_eq!(log.delete(&a.id).unwrap().task, "a");
        assert!(matches!(log.delete(&a.id), Err(LogError::NotFound(_))));
        assert_eq!(log.clear().unwrap(), 2);
        assert!(log.is_empty());
    }

    #[test]
    fn corrupt_log_loads_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(LOGS_KEY, "[{\"id\":").unwrap();
        assert!(TaskLog::load(store).is_empty());
    }

    #[test]
    fn serialized_shape_uses_display_labels() {
        let mut entry_fields = fields("apply");
        entry_fields.category = Category::JobSearch;
        let json = serde_json::to_value(&entry_fields).unwrap();
        assert_eq!(json["category"], "Job Search");
        assert_eq!(json["value"], "Medium");
        assert_eq!(
            serde_json::to_value(TaskStatus::Completed).unwrap(),
            serde_json::json!("completed")
        );
    }
}
