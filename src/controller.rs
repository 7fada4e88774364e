use crate::clock::Clock;
use crate::error::AppResult;
use crate::notifier::{self, Mailer, SendOutcome, Surface};
use crate::reminder::{Draft, Reminder};
use crate::scheduler::{plan_delay, Scheduler};
use crate::storage::Storage;
use crate::validate::validate_draft;
use crate::view::{self, ListView, Selection, Tab};
use chrono::NaiveDateTime;
use log::{debug, error, info};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Explicit application context: the reminder store plus the transient UI state
/// derived from it.
pub struct ReminderApp {
    storage: Storage,
    selection: Selection,
    tab: Tab,
}

impl ReminderApp {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            selection: Selection::default(),
            tab: Tab::default(),
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn view(&self) -> ListView {
        view::render(self.storage.all(), &self.selection, self.tab)
    }

    /// Validate and store a new reminder, then show the list
    pub fn submit(&mut self, draft: &Draft, now: NaiveDateTime) -> AppResult<Reminder> {
        let reminder = validate_draft(draft, now)?;
        let stored = self.storage.insert(reminder)?;
        self.tab = Tab::View;
        Ok(stored)
    }

    pub fn switch_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    /// Tick or untick one row. Unknown ids are ignored.
    pub fn toggle_selection(&mut self, id: i64, checked: bool) -> bool {
        if !self.storage.contains(id) {
            return false;
        }
        self.selection.set(id, checked);
        true
    }

    pub fn set_select_all(&mut self, checked: bool) {
        if checked {
            self.selection.select_all(self.storage.all());
        } else {
            self.selection.clear();
        }
    }

    pub fn delete(&mut self, ids: &HashSet<i64>) -> AppResult<usize> {
        let removed = self.storage.delete_many(ids)?;
        self.selection.prune(self.storage.all());
        Ok(removed)
    }

    pub fn delete_selected(&mut self) -> AppResult<usize> {
        if self.selection.is_empty() {
            return Ok(0);
        }
        let ids = self.selection.ids().clone();
        let removed = self.delete(&ids)?;
        self.selection.clear();
        Ok(removed)
    }

    /// Record a send outcome. `Ok(false)` when the reminder is gone or already final.
    pub fn record_outcome(&mut self, id: i64, outcome: SendOutcome) -> AppResult<bool> {
        self.storage.update_status(id, outcome.status())
    }

    /// Pending reminders still eligible to fire
    pub fn pending_reminders(&self) -> Vec<Reminder> {
        self.storage.pending().cloned().collect()
    }
}

/// Connects user events and timer expiry to the app context.
///
/// The context lock is never held across an await, so every store mutation runs
/// to completion before the next one starts.
pub struct ReminderService {
    app: Mutex<ReminderApp>,
    scheduler: Scheduler,
    mailer: Arc<dyn Mailer>,
    surface: Arc<dyn Surface>,
    clock: Arc<dyn Clock>,
    fire_stale: bool,
}

impl ReminderService {
    pub fn new(
        app: ReminderApp,
        mailer: Arc<dyn Mailer>,
        surface: Arc<dyn Surface>,
        clock: Arc<dyn Clock>,
        fire_stale: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            app: Mutex::new(app),
            scheduler: Scheduler::new(),
            mailer,
            surface,
            clock,
            fire_stale,
        })
    }

    /// Lock the app context, recovering from poison if needed
    pub fn lock_app(&self) -> MutexGuard<'_, ReminderApp> {
        self.app.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn view(&self) -> ListView {
        self.lock_app().view()
    }

    /// Report a failure to the user and hand it back to the caller
    fn report<T>(&self, result: AppResult<T>) -> AppResult<T> {
        if let Err(e) = &result {
            if !e.is_validation() {
                error!("{}", e);
            }
            self.surface.toast(&e.to_string());
        }
        result
    }

    /// Compose-submit: validate, store, arm, show the list
    pub fn submit(self: &Arc<Self>, draft: &Draft) -> AppResult<ListView> {
        let now = self.clock.now();
        let (reminder, view) = {
            let mut app = self.lock_app();
            let reminder = self.report(app.submit(draft, now))?;
            (reminder, app.view())
        };

        info!("Reminder {} set for {}", reminder.id, reminder.scheduled_at());
        self.arm(&reminder);
        self.surface.toast("Reminder set successfully");
        Ok(view)
    }

    pub fn switch_tab(&self, tab: Tab) -> ListView {
        let mut app = self.lock_app();
        app.switch_tab(tab);
        app.view()
    }

    pub fn toggle_selection(&self, id: i64, checked: bool) -> ListView {
        let mut app = self.lock_app();
        app.toggle_selection(id, checked);
        app.view()
    }

    pub fn set_select_all(&self, checked: bool) -> ListView {
        let mut app = self.lock_app();
        app.set_select_all(checked);
        app.view()
    }

    /// Delete a single reminder; the caller has already confirmed
    pub fn delete_one(&self, id: i64) -> AppResult<ListView> {
        let (removed, view) = {
            let mut app = self.lock_app();
            let ids: HashSet<i64> = [id].into_iter().collect();
            let removed = self.report(app.delete(&ids))?;
            (removed, app.view())
        };
        if removed > 0 {
            self.surface.toast("Reminder deleted");
        }
        Ok(view)
    }

    /// Delete every selected reminder; the caller has already confirmed
    pub fn delete_selected(&self) -> AppResult<ListView> {
        let (removed, view) = {
            let mut app = self.lock_app();
            let removed = self.report(app.delete_selected())?;
            (removed, app.view())
        };
        if removed > 0 {
            self.surface.toast("Selected reminders deleted");
        }
        Ok(view)
    }

    /// Arm a timer for one reminder. Returns whether a timer was started.
    pub fn arm(self: &Arc<Self>, reminder: &Reminder) -> bool {
        let now = self.clock.now();
        let Some(delay) = plan_delay(reminder, now, self.fire_stale) else {
            info!(
                "Reminder {} was due at {} and stays pending",
                reminder.id,
                reminder.scheduled_at()
            );
            return false;
        };

        let service = Arc::clone(self);
        let id = reminder.id;
        self.scheduler.arm(id, delay, async move {
            service.fire(id).await;
        })
    }

    /// Startup: arm every pending reminder once
    pub fn rehydrate(self: &Arc<Self>) -> usize {
        let pending = self.lock_app().pending_reminders();
        let armed = pending.iter().filter(|r| self.arm(r)).count();
        info!("Re-armed {} of {} pending reminders", armed, pending.len());
        armed
    }

    /// Timer expiry: send, record the outcome, repaint and alert.
    ///
    /// Returns `None` when the reminder was deleted or finished before its timer
    /// went off.
    pub async fn fire(&self, id: i64) -> Option<SendOutcome> {
        let reminder = self
            .lock_app()
            .storage()
            .get(id)
            .filter(|r| r.is_pending())
            .cloned();
        let Some(reminder) = reminder else {
            debug!("Reminder {} is gone or finished, skipping send", id);
            return None;
        };

        let outcome = notifier::notify(self.mailer.as_ref(), self.surface.as_ref(), &reminder).await;

        let recorded = {
            let mut app = self.lock_app();
            app.record_outcome(id, outcome).map(|updated| (updated, app.view()))
        };

        match recorded {
            Ok((true, view)) => {
                info!("Reminder {} marked {}", id, outcome.status().as_str());
                self.surface.refresh(&view);
                notifier::alert(self.surface.as_ref(), &reminder);
            }
            Ok((false, _)) => debug!("Reminder {} was deleted while sending", id),
            Err(e) => {
                error!("Could not record outcome for reminder {}: {}", id, e);
                self.surface.toast(&e.to_string());
            }
        }

        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::AppError;
    use crate::notifier::testing::{FailingMailer, RecordingSurface};
    use crate::notifier::SimulatedMailer;
    use crate::reminder::Status;
    use chrono::{Duration as ChronoDuration, NaiveDate};
    use std::time::Duration;
    use tempfile::TempDir;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn draft(message: &str, email: &str, date: &str, time: &str) -> Draft {
        Draft {
            message: message.to_string(),
            email: email.to_string(),
            date: date.to_string(),
            time: time.to_string(),
        }
    }

    fn tomorrow_draft(message: &str) -> Draft {
        draft(message, "a@b.com", "2026-10-17", "09:00")
    }

    fn app_in(dir: &TempDir) -> ReminderApp {
        ReminderApp::new(Storage::load(dir.path().to_path_buf()))
    }

    struct Harness {
        service: Arc<ReminderService>,
        surface: Arc<RecordingSurface>,
        clock: Arc<FixedClock>,
        _dir: TempDir,
    }

    fn harness_with(app: ReminderApp, dir: TempDir, mailer: Arc<dyn Mailer>, fire_stale: bool) -> Harness {
        let surface = Arc::new(RecordingSurface::permitted());
        let clock = Arc::new(FixedClock::at(noon()));
        let service = ReminderService::new(app, mailer, surface.clone(), clock.clone(), fire_stale);
        Harness {
            service,
            surface,
            clock,
            _dir: dir,
        }
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(&dir);
        harness_with(
            app,
            dir,
            Arc::new(SimulatedMailer::new(Duration::from_millis(1000))),
            true,
        )
    }

    #[test]
    fn test_submit_prepends_pending_and_switches_tab() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);

        let older = app.submit(&tomorrow_draft("Older"), noon()).unwrap();
        app.switch_tab(Tab::Compose);
        let rent = app.submit(&tomorrow_draft("Pay rent"), noon()).unwrap();

        let all = app.storage().all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, rent.id);
        assert_eq!(all[1].id, older.id);
        assert_eq!(all[0].message, "Pay rent");
        assert_eq!(all[0].email, "a@b.com");
        assert_eq!(all[0].status, Status::Pending);
        assert_eq!(app.tab(), Tab::View);
    }

    #[test]
    fn test_rejected_submissions_add_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);

        let cases = [
            (draft("", "a@b.com", "2026-10-17", "09:00"), AppError::MissingField),
            (draft("m", "not-an-email", "2026-10-17", "09:00"), AppError::InvalidEmail),
            (draft("m", "a@b.com", "2026-10-16", "12:00"), AppError::NotFuture),
        ];
        for (draft, expected) in cases {
            assert_eq!(app.submit(&draft, noon()).unwrap_err(), expected);
        }

        assert!(app.storage().is_empty());
        assert_eq!(app.tab(), Tab::Compose);
    }

    #[test]
    fn test_bulk_delete_removes_only_selected() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);
        let a = app.submit(&tomorrow_draft("a"), noon()).unwrap();
        let b = app.submit(&tomorrow_draft("b"), noon()).unwrap();
        let c = app.submit(&tomorrow_draft("c"), noon()).unwrap();
        app.record_outcome(b.id, SendOutcome::Failed).unwrap();

        assert!(app.toggle_selection(a.id, true));
        assert!(app.toggle_selection(c.id, true));
        assert!(app.view().bulk_delete_visible);

        assert_eq!(app.delete_selected().unwrap(), 2);

        let remaining = app.storage().all();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, b.id);
        assert_eq!(remaining[0].message, "b");
        assert_eq!(remaining[0].status, Status::Failed);
        assert!(app.selection().is_empty());
        assert!(!app.view().bulk_delete_visible);
    }

    #[test]
    fn test_single_delete_prunes_selection() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);
        let a = app.submit(&tomorrow_draft("a"), noon()).unwrap();
        let b = app.submit(&tomorrow_draft("b"), noon()).unwrap();
        app.set_select_all(true);
        assert!(app.view().select_all_checked);

        let ids: HashSet<i64> = [a.id].into_iter().collect();
        assert_eq!(app.delete(&ids).unwrap(), 1);

        assert!(!app.selection().contains(a.id));
        assert!(app.selection().contains(b.id));
        // The one remaining row is still selected, so select-all stays checked
        assert!(app.view().select_all_checked);
    }

    #[test]
    fn test_selection_ignores_unknown_ids() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);

        assert!(!app.toggle_selection(99, true));
        assert!(app.selection().is_empty());
        assert_eq!(app.delete_selected().unwrap(), 0);
    }

    #[test]
    fn test_empty_app_view() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);
        app.switch_tab(Tab::View);

        let view = app.view();
        assert_eq!(view.placeholder, Some(view::EMPTY_PLACEHOLDER));
        assert!(!view.bulk_delete_visible);
        assert!(!view.select_all_checked);
    }

    #[test]
    fn test_switching_tabs_leaves_store_alone() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);
        app.submit(&tomorrow_draft("a"), noon()).unwrap();
        let before = app.storage().all().to_vec();

        app.switch_tab(Tab::Compose);
        app.switch_tab(Tab::View);
        assert_eq!(app.storage().all(), before.as_slice());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reminder_fires_while_running() {
        let h = harness();
        h.service.submit(&draft("Stretch", "a@b.com", "2026-10-16", "12:30")).unwrap();
        let id = h.service.lock_app().storage().all()[0].id;
        assert!(h.service.scheduler().is_armed(id));
        assert_eq!(h.surface.toasts(), vec!["Reminder set successfully"]);

        // 30 minutes until due plus one second of simulated latency
        tokio::time::sleep(Duration::from_secs(30 * 60 + 2)).await;

        assert_eq!(h.service.lock_app().storage().get(id).unwrap().status, Status::Sent);
        let view = h.surface.last_view().unwrap();
        assert_eq!(view.rows[0].status, Status::Sent);
        assert_eq!(view.rows[0].status_class, Some("status-sent"));
        assert!(h.surface.toasts().contains(&"Email notification sent to a@b.com".to_string()));
        assert_eq!(
            h.surface.native.lock().unwrap().clone(),
            vec![("Reminder".to_string(), "Stretch".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_send_marks_failed() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(&dir);
        let h = harness_with(app, dir, Arc::new(FailingMailer), true);

        h.service.submit(&draft("Call", "a@b.com", "2026-10-16", "12:01")).unwrap();
        let id = h.service.lock_app().storage().all()[0].id;

        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(h.service.lock_app().storage().get(id).unwrap().status, Status::Failed);
        assert!(h.surface.toasts().contains(&"Failed to send email notification".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleted_before_fire_is_harmless() {
        let h = harness();
        h.service.submit(&draft("Gone", "a@b.com", "2026-10-16", "12:05")).unwrap();
        let id = h.service.lock_app().storage().all()[0].id;

        h.service.delete_one(id).unwrap();
        tokio::time::sleep(Duration::from_secs(10 * 60)).await;

        assert!(h.service.lock_app().storage().is_empty());
        assert!(h.surface.last_view().is_none());
        assert!(h.surface.native.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleted_while_sending_skips_status() {
        let h = harness();
        h.service.submit(&draft("Race", "a@b.com", "2026-10-16", "12:05")).unwrap();
        let id = h.service.lock_app().storage().all()[0].id;

        // Timer fires at 5 minutes, the send takes another second
        tokio::time::sleep(Duration::from_millis(5 * 60 * 1000 + 500)).await;
        h.service.delete_one(id).unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(h.service.lock_app().storage().is_empty());
        assert!(h.surface.last_view().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rehydrate_arms_pending_and_fires_stale() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut app = app_in(&dir);
            app.submit(&draft("Later", "a@b.com", "2026-10-16", "13:00"), noon()).unwrap();
            app.submit(&draft("Missed", "a@b.com", "2026-10-16", "12:30"), noon()).unwrap();
            let done = app.submit(&draft("Done", "a@b.com", "2026-10-16", "12:10"), noon()).unwrap();
            app.record_outcome(done.id, SendOutcome::Delivered).unwrap();
        }

        // Restart an hour later: "Missed" is now stale, "Later" is still ahead
        let app = app_in(&dir);
        let h = harness_with(
            app,
            dir,
            Arc::new(SimulatedMailer::new(Duration::from_millis(1000))),
            true,
        );
        h.clock.advance(ChronoDuration::minutes(45));

        assert_eq!(h.service.rehydrate(), 2);

        tokio::time::sleep(Duration::from_secs(2)).await;
        let statuses: Vec<(String, Status)> = h
            .service
            .lock_app()
            .storage()
            .all()
            .iter()
            .map(|r| (r.message.clone(), r.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("Done".to_string(), Status::Sent),
                ("Missed".to_string(), Status::Sent),
                ("Later".to_string(), Status::Pending),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rehydrate_can_leave_stale_pending() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut app = app_in(&dir);
            app.submit(&draft("Missed", "a@b.com", "2026-10-16", "12:30"), noon()).unwrap();
        }

        let app = app_in(&dir);
        let h = harness_with(
            app,
            dir,
            Arc::new(SimulatedMailer::new(Duration::from_millis(1000))),
            false,
        );
        h.clock.advance(ChronoDuration::hours(1));

        assert_eq!(h.service.rehydrate(), 0);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(h.service.lock_app().storage().all()[0].status, Status::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_service_reports_validation_toasts() {
        let h = harness();

        let result = h.service.submit(&draft("m", "not-an-email", "2026-10-17", "09:00"));
        assert_eq!(result.unwrap_err(), AppError::InvalidEmail);
        assert_eq!(h.surface.toasts(), vec!["Please enter a valid email address"]);
        assert!(h.service.view().rows.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_service_bulk_delete_toast() {
        let h = harness();
        h.service.submit(&tomorrow_draft("a")).unwrap();
        h.service.submit(&tomorrow_draft("b")).unwrap();

        let view = h.service.set_select_all(true);
        assert!(view.select_all_checked);
        let view = h.service.delete_selected().unwrap();

        assert_eq!(view.placeholder, Some(view::EMPTY_PLACEHOLDER));
        assert_eq!(h.surface.toasts().last().unwrap(), "Selected reminders deleted");
    }
}
