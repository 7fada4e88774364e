use crate::config::TOAST_DURATION_MS;
use crate::reminder::{Reminder, Status};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const EMPTY_PLACEHOLDER: &str = "No reminders yet";

/// Which panel is on screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Compose,
    View,
}

/// Ids of the rows ticked in the list. References storage entries, never owns them.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    ids: HashSet<i64>,
}

impl Selection {
    pub fn ids(&self) -> &HashSet<i64> {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    pub fn set(&mut self, id: i64, checked: bool) {
        if checked {
            self.ids.insert(id);
        } else {
            self.ids.remove(&id);
        }
    }

    pub fn select_all<'a>(&mut self, reminders: impl IntoIterator<Item = &'a Reminder>) {
        self.ids.extend(reminders.into_iter().map(|r| r.id));
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop ids whose reminder no longer exists
    pub fn prune(&mut self, reminders: &[Reminder]) {
        let live: HashSet<i64> = reminders.iter().map(|r| r.id).collect();
        self.ids.retain(|id| live.contains(id));
    }

    /// Select-all is checked exactly when every one of a non-empty list is selected
    pub fn covers_all(&self, total: usize) -> bool {
        total > 0 && self.ids.len() == total
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRow {
    pub id: i64,
    pub message: String,
    pub email: String,
    pub scheduled_for: String,
    pub status: Status,
    pub status_class: Option<&'static str>,
    pub selected: bool,
}

/// Everything the frontend needs to paint both panels
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListView {
    pub tab: Tab,
    pub rows: Vec<ReminderRow>,
    pub placeholder: Option<&'static str>,
    pub select_all_checked: bool,
    pub bulk_delete_visible: bool,
}

pub fn format_scheduled(at: NaiveDateTime) -> String {
    at.format("%b %-d, %Y, %-I:%M %p").to_string()
}

fn status_class(status: Status) -> Option<&'static str> {
    match status {
        Status::Sent => Some("status-sent"),
        Status::Failed => Some("status-failed"),
        Status::Pending => None,
    }
}

pub fn render(reminders: &[Reminder], selection: &Selection, tab: Tab) -> ListView {
    let rows = reminders
        .iter()
        .map(|r| ReminderRow {
            id: r.id,
            message: r.message.clone(),
            email: r.email.clone(),
            scheduled_for: format_scheduled(r.scheduled_at()),
            status: r.status,
            status_class: status_class(r.status),
            selected: selection.contains(r.id),
        })
        .collect();

    ListView {
        tab,
        rows,
        placeholder: reminders.is_empty().then_some(EMPTY_PLACEHOLDER),
        select_all_checked: selection.covers_all(reminders.len()),
        bulk_delete_visible: !reminders.is_empty() && !selection.is_empty(),
    }
}

/// Transient status message; a newer toast replaces the one on screen
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
    pub message: String,
    pub duration_ms: u64,
}

impl Toast {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            duration_ms: TOAST_DURATION_MS,
        }
    }
}
