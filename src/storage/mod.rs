mod local;

use crate::error::AppResult;
use crate::reminder::{Reminder, Status};
use chrono::Utc;
use log::{info, warn};
use std::collections::HashSet;
use std::path::PathBuf;

/// Owns the ordered reminder collection (most recent first) and mirrors it to disk
/// after every mutation.
pub struct Storage {
    data: Vec<Reminder>,
    app_data_path: PathBuf,
}

impl Storage {
    /// Read the persisted collection. Never fails: malformed data starts an empty store.
    pub fn load(app_data_path: PathBuf) -> Self {
        let data = match local::load_local(&app_data_path) {
            Ok(data) => {
                info!("Loaded {} reminders from {:?}", data.len(), app_data_path);
                data
            }
            Err(e) => {
                warn!("{}; starting with an empty reminder list", e);
                Vec::new()
            }
        };

        Self { data, app_data_path }
    }

    fn save(&self) -> AppResult<()> {
        local::save_local(&self.app_data_path, &self.data)
    }

    /// Persist the current sequence, restoring `previous` if the write fails
    fn commit(&mut self, previous: Vec<Reminder>) -> AppResult<()> {
        if let Err(e) = self.save() {
            warn!("Rolling back unsaved change: {}", e);
            self.data = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Creation timestamp in millis, bumped past any existing id
    fn next_id(&self) -> i64 {
        let max_existing = self.data.iter().map(|r| r.id).max().unwrap_or(0);
        Utc::now().timestamp_millis().max(max_existing + 1)
    }

    // ============ Public API ============

    pub fn all(&self) -> &[Reminder] {
        &self.data
    }

    pub fn get(&self, id: i64) -> Option<&Reminder> {
        self.data.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.get(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn pending(&self) -> impl Iterator<Item = &Reminder> {
        self.data.iter().filter(|r| r.is_pending())
    }

    /// Assign an id, put the reminder at the front and persist
    pub fn insert(&mut self, mut reminder: Reminder) -> AppResult<Reminder> {
        reminder.id = self.next_id();
        reminder.status = Status::Pending;

        let previous = self.data.clone();
        self.data.insert(0, reminder.clone());
        self.commit(previous)?;

        Ok(reminder)
    }

    /// Move a pending reminder to a terminal status.
    ///
    /// Returns `Ok(false)` without touching disk when the id is gone (deleted while
    /// its timer was running) or the reminder already left `Pending`.
    pub fn update_status(&mut self, id: i64, status: Status) -> AppResult<bool> {
        if !status.is_terminal() {
            return Ok(false);
        }

        let previous = self.data.clone();
        match self.data.iter_mut().find(|r| r.id == id) {
            Some(reminder) if reminder.is_pending() => reminder.status = status,
            _ => return Ok(false),
        }
        self.commit(previous)?;

        Ok(true)
    }

    /// Remove every reminder whose id is in `ids`, returning how many went away
    pub fn delete_many(&mut self, ids: &HashSet<i64>) -> AppResult<usize> {
        let previous = self.data.clone();
        self.data.retain(|r| !ids.contains(&r.id));

        let removed = previous.len() - self.data.len();
        if removed == 0 {
            return Ok(0);
        }
        self.commit(previous)?;

        Ok(removed)
    }
}
