//! Locked single-task countdown timer
//!
//! At most one task is timed at a time. Elapsed time is always derived from
//! the anchor timestamp and the current wall clock, so ticks missed while the
//! process was suspended or not running are never lost.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{Clock, TaskId, TimerRecord};
use crate::{
    state::TimerSnapshot,
    storage::{KeyValueStore, TIMER_KEY},
};

/// One-shot callback fired on natural completion
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

/// Result of a single tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No task is locked
    Idle,
    /// Still counting towards the duration (or no duration is known)
    Running { elapsed_seconds: u64 },
    /// The duration was reached but no completion callback is attached yet
    AwaitingCallback { elapsed_seconds: u64 },
    /// The completion callback of the locked task is still running
    Completing,
    /// The duration was reached, the callback fired and the timer is idle again
    Completed { task_id: TaskId },
}

/// The task currently locked in the timer
struct Activation {
    task_id: TaskId,
    started_at: DateTime<Utc>,
    duration_seconds: Option<u64>,
    elapsed_seconds: u64,
    on_complete: Option<CompletionCallback>,
    /// Set once the callback has been taken; the task stays locked until it returns
    completing: bool,
}

impl Activation {
    fn record(&self) -> TimerRecord {
        TimerRecord {
            task_id: self.task_id.clone(),
            start_timestamp: self.started_at.timestamp_millis(),
            elapsed: self.elapsed_seconds,
            duration: self.duration_seconds,
        }
    }

    fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            active_task_id: Some(self.task_id.clone()),
            is_locked: true,
            elapsed_seconds: self.elapsed_seconds,
            duration_seconds: self.duration_seconds,
            remaining_seconds: self
                .duration_seconds
                .map(|duration| duration.saturating_sub(self.elapsed_seconds)),
            started_at: Some(self.started_at),
            completion_attached: self.on_complete.is_some(),
        }
    }
}

/// Whole seconds between the anchor and `now`; zero if the clock went backwards
pub fn elapsed_between(started_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (now - started_at).num_milliseconds().max(0);
    u64::try_from(millis / 1000).unwrap_or(0)
}

/// Timer service owning the single locked task and its persisted record
pub struct TimerService {
    active: Mutex<Option<Activation>>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    updates: watch::Sender<TimerSnapshot>,
}

impl TimerService {
    /// Create an idle timer without looking at persisted state
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let (updates, _) = watch::channel(TimerSnapshot::idle());
        Self {
            active: Mutex::new(None),
            store,
            clock,
            updates,
        }
    }

    /// Create a timer, resuming a persisted activation if one is stored.
    ///
    /// Elapsed time is recomputed from the stored anchor right away. A
    /// restored activation carries the persisted duration (if any) but no
    /// completion callback; see [`TimerService::reattach`].
    pub fn restore(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let service = Self::new(store, clock);

        let Some(record) = service.load_record() else {
            debug!("No persisted timer, starting idle");
            return service;
        };
        let Some(started_at) = DateTime::from_timestamp_millis(record.start_timestamp) else {
            warn!("Persisted timer anchor is out of range, starting idle");
            service.clear_record();
            return service;
        };

        let now = service.clock.now();
        let activation = Activation {
            task_id: record.task_id,
            started_at,
            duration_seconds: record.duration,
            elapsed_seconds: elapsed_between(started_at, now),
            on_complete: None,
            completing: false,
        };
        info!(
            "Restored locked task {} ({}s elapsed, duration {:?})",
            activation.task_id, activation.elapsed_seconds, activation.duration_seconds
        );

        let mut active = service.lock();
        service.publish(Some(&activation));
        *active = Some(activation);
        drop(active);
        service
    }

    fn load_record(&self) -> Option<TimerRecord> {
        let raw = match self.store.get(TIMER_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read persisted timer: {}", e);
                return None;
            }
        };
        let record = TimerRecord::decode(&raw);
        if record.is_none() {
            warn!("Discarding malformed persisted timer record");
            self.clear_record();
        }
        record
    }

    fn lock(&self) -> MutexGuard<'_, Option<Activation>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock `task_id` and start counting towards `duration_seconds`.
    ///
    /// Returns `false` without touching anything if another task is locked.
    pub fn start_timer<F>(&self, task_id: TaskId, duration_seconds: u64, on_complete: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let mut active = self.lock();
        if let Some(current) = active.as_ref() {
            warn!(
                "Ignoring start of task {}: task {} is already locked",
                task_id, current.task_id
            );
            return false;
        }

        let activation = Activation {
            task_id,
            started_at: self.clock.now(),
            duration_seconds: Some(duration_seconds),
            elapsed_seconds: 0,
            on_complete: Some(Box::new(on_complete)),
            completing: false,
        };
        info!("Locked task {} for {}s", activation.task_id, duration_seconds);

        self.persist(&activation);
        self.publish(Some(&activation));
        *active = Some(activation);
        true
    }

    /// Abort the locked task without firing its completion callback.
    ///
    /// Returns `true` if a task was locked. Safe to call when idle.
    pub fn stop_timer(&self) -> bool {
        let mut active = self.lock();
        let stopped = active.take();
        self.clear_record();
        self.publish(None);
        drop(active);

        match stopped {
            Some(activation) => {
                info!(
                    "Stopped task {} manually after {}s",
                    activation.task_id, activation.elapsed_seconds
                );
                true
            }
            None => {
                debug!("Stop requested while idle");
                false
            }
        }
    }

    /// Recompute elapsed time, persist it and complete the task if its
    /// duration has been reached.
    ///
    /// The completion callback runs before the timer is reset: while it runs
    /// the task is still locked, so it can read which task completed and no
    /// other task can be started in between.
    pub fn tick(&self) -> TickOutcome {
        let mut active = self.lock();
        let Some(activation) = active.as_mut() else {
            return TickOutcome::Idle;
        };
        if activation.completing {
            return TickOutcome::Completing;
        }

        let now = self.clock.now();
        activation.elapsed_seconds = elapsed_between(activation.started_at, now);
        let elapsed_seconds = activation.elapsed_seconds;
        let due = activation
            .duration_seconds
            .is_some_and(|duration| elapsed_seconds >= duration);

        if !due || activation.on_complete.is_none() {
            self.persist(activation);
            self.publish(Some(&*activation));
            debug!("Tick for task {}: {}s", activation.task_id, elapsed_seconds);
            return if due {
                TickOutcome::AwaitingCallback { elapsed_seconds }
            } else {
                TickOutcome::Running { elapsed_seconds }
            };
        }

        // Natural completion: fire outside the lock, then reset
        activation.completing = true;
        let task_id = activation.task_id.clone();
        let on_complete = activation.on_complete.take();
        drop(active);

        info!("Task {} completed after {}s", task_id, elapsed_seconds);
        if let Some(on_complete) = on_complete {
            on_complete();
        }

        let mut active = self.lock();
        if active
            .as_ref()
            .is_some_and(|a| a.completing && a.task_id == task_id)
        {
            *active = None;
            self.clear_record();
            self.publish(None);
        }
        drop(active);

        TickOutcome::Completed { task_id }
    }

    /// Reconnect a completion callback (and optionally a duration) to the
    /// locked task, typically after [`TimerService::restore`].
    ///
    /// Returns `false` if `task_id` is not the locked task.
    pub fn reattach<F>(
        &self,
        task_id: &TaskId,
        duration_seconds: Option<u64>,
        on_complete: F,
    ) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let mut active = self.lock();
        let Some(activation) = active
            .as_mut()
            .filter(|a| &a.task_id == task_id && !a.completing)
        else {
            debug!("Not reattaching task {}: it is not locked", task_id);
            return false;
        };

        if duration_seconds.is_some() {
            activation.duration_seconds = duration_seconds;
        }
        activation.on_complete = Some(Box::new(on_complete));
        info!(
            "Reattached completion for task {} (duration {:?})",
            task_id, activation.duration_seconds
        );

        self.persist(activation);
        self.publish(Some(&*activation));
        true
    }

    pub fn active_task_id(&self) -> Option<TaskId> {
        self.lock().as_ref().map(|a| a.task_id.clone())
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.lock().as_ref().map_or(0, |a| a.elapsed_seconds)
    }

    pub fn is_locked(&self) -> bool {
        self.lock().is_some()
    }

    /// Current state as last computed
    pub fn snapshot(&self) -> TimerSnapshot {
        self.lock()
            .as_ref()
            .map_or_else(TimerSnapshot::idle, Activation::snapshot)
    }

    /// Receive a new snapshot after every transition and tick
    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.updates.subscribe()
    }

    fn publish(&self, activation: Option<&Activation>) {
        let snapshot = activation.map_or_else(TimerSnapshot::idle, Activation::snapshot);
        self.updates.send_replace(snapshot);
    }

    fn persist(&self, activation: &Activation) {
        let raw = match activation.record().encode() {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to encode timer record: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(TIMER_KEY, &raw) {
            warn!("Failed to persist timer state: {}", e);
        }
    }

    fn clear_record(&self) {
        if let Err(e) = self.store.remove(TIMER_KEY) {
            warn!("Failed to remove persisted timer state: {}", e);
        }
    }
}

impl fmt::Debug for TimerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerService")
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}
