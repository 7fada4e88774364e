use crate::reminder::Reminder;
use chrono::NaiveDateTime;
use log::{debug, warn};
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Decide how long to wait before firing `reminder`.
///
/// `None` means do not arm: the reminder is no longer pending, or it is stale and
/// stale reminders are not being fired. A stale reminder that should fire gets a
/// zero delay.
pub fn plan_delay(reminder: &Reminder, now: NaiveDateTime, fire_stale: bool) -> Option<Duration> {
    if !reminder.is_pending() {
        return None;
    }

    if reminder.is_due(now) {
        return fire_stale.then_some(Duration::ZERO);
    }
    (reminder.scheduled_at() - now).to_std().ok()
}

/// Process-local one-shot timers, at most one per reminder id.
///
/// Nothing here survives a restart; timers are re-derived from the pending
/// reminders in storage every time the app starts.
#[derive(Clone, Default)]
pub struct Scheduler {
    armed: Arc<Mutex<HashSet<i64>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_armed(&self) -> MutexGuard<'_, HashSet<i64>> {
        self.armed.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_armed(&self, id: i64) -> bool {
        self.lock_armed().contains(&id)
    }

    pub fn armed_count(&self) -> usize {
        self.lock_armed().len()
    }

    /// Run `fire` once after `delay`. Must be called from inside the tokio runtime.
    ///
    /// Returns false, and drops `fire`, when `id` already has a timer.
    pub fn arm<F>(&self, id: i64, delay: Duration, fire: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.lock_armed().insert(id) {
            warn!("Reminder {} already has a timer, not arming again", id);
            return false;
        }

        debug!("Arming reminder {} to fire in {:?}", id, delay);
        let armed = Arc::clone(&self.armed);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            armed.lock().unwrap_or_else(|e| e.into_inner()).remove(&id);
            fire.await;
        });

        true
    }
}
