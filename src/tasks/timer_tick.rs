//! Timer tick background task

use std::{sync::Arc, time::Duration};

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::timer::{TickOutcome, TimerService};

/// Background task that ticks the timer while a task is locked.
///
/// The interval only exists while the timer is locked and is dropped on any
/// transition back to idle, so no stale tick can fire afterwards. Runs until
/// aborted.
pub async fn timer_tick_task(timer: Arc<TimerService>, period: Duration) {
    info!("Starting timer tick task ({}ms period)", period.as_millis());

    let mut updates = timer.subscribe();

    loop {
        // Wait for a task to be locked
        loop {
            let locked = updates.borrow_and_update().is_locked;
            if locked {
                break;
            }
            if updates.changed().await.is_err() {
                return;
            }
        }

        debug!("Task locked, ticking every {}ms", period.as_millis());
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match timer.tick() {
                        TickOutcome::Idle => break,
                        TickOutcome::Completed { task_id } => {
                            debug!("Tick loop finished with completion of {}", task_id);
                            break;
                        }
                        TickOutcome::Running { .. }
                        | TickOutcome::AwaitingCallback { .. }
                        | TickOutcome::Completing => {}
                    }
                }

                changed = updates.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let locked = updates.borrow_and_update().is_locked;
                    if !locked {
                        debug!("Timer unlocked, cancelling ticks");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        storage::{KeyValueStore, MemoryStore, TIMER_KEY},
        timer::{ManualClock, TaskId},
    };

    fn setup() -> (Arc<MemoryStore>, Arc<ManualClock>, Arc<TimerService>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::at_millis(1_700_000_000_000));
        let timer = Arc::new(TimerService::new(store.clone(), clock.clone()));
        (store, clock, timer)
    }

    #[tokio::test(start_paused = true)]
    async fn drives_a_locked_task_to_completion_once() {
        let (store, clock, timer) = setup();
        let driver = tokio::spawn(timer_tick_task(Arc::clone(&timer), Duration::from_secs(1)));

        let calls = Arc::new(AtomicUsize::new(0));
        let handle = calls.clone();
        timer.start_timer(TaskId::from("task-A"), 2, move || {
            handle.fetch_add(1, Ordering::SeqCst);
        });

        // A long sleep gap: wall clock jumps far past the duration
        clock.advance_secs(10);
        tokio::time::sleep(Duration::from_millis(1_100)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!timer.is_locked());
        assert_eq!(store.get(TIMER_KEY).unwrap(), None);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        driver.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_update_elapsed_while_locked() {
        let (store, clock, timer) = setup();
        let driver = tokio::spawn(timer_tick_task(Arc::clone(&timer), Duration::from_secs(1)));

        timer.start_timer(TaskId::from("task-A"), 600, || {});
        clock.advance_secs(3);
        tokio::time::sleep(Duration::from_millis(1_100)).await;

        assert_eq!(timer.elapsed_seconds(), 3);
        let stored = store.get(TIMER_KEY).unwrap().unwrap();
        assert!(stored.contains("\"elapsed\":3"));

        driver.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_pending_ticks() {
        let (store, clock, timer) = setup();
        let driver = tokio::spawn(timer_tick_task(Arc::clone(&timer), Duration::from_secs(1)));

        let calls = Arc::new(AtomicUsize::new(0));
        let handle = calls.clone();
        timer.start_timer(TaskId::from("task-A"), 2, move || {
            handle.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(500)).await;
        timer.stop_timer();

        clock.advance_secs(10);
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!timer.is_locked());
        assert_eq!(store.get(TIMER_KEY).unwrap(), None);

        // A fresh cycle is picked up again
        timer.start_timer(TaskId::from("task-B"), 1, || {});
        clock.advance_secs(1);
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert!(!timer.is_locked());

        driver.abort();
    }
}
