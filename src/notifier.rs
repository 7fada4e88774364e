use crate::config::NOTIFICATION_TITLE;
use crate::error::AppResult;
use crate::reminder::{Reminder, Status};
use crate::view::ListView;
use async_trait::async_trait;
use log::{error, info, warn};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    Failed,
}

impl SendOutcome {
    /// Terminal reminder status recorded for this outcome
    pub fn status(self) -> Status {
        match self {
            SendOutcome::Delivered => Status::Sent,
            SendOutcome::Failed => Status::Failed,
        }
    }
}

/// Email delivery backend
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, reminder: &Reminder) -> AppResult<()>;
}

/// Logs the send and waits a fixed latency. Nothing leaves the machine.
pub struct SimulatedMailer {
    latency: Duration,
}

impl SimulatedMailer {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl Mailer for SimulatedMailer {
    async fn send(&self, reminder: &Reminder) -> AppResult<()> {
        info!(
            "Sending email notification to {} with message: {}",
            reminder.email, reminder.message
        );
        tokio::time::sleep(self.latency).await;
        Ok(())
    }
}

/// Everything the core needs from the user-facing shell
pub trait Surface: Send + Sync {
    /// Show a transient message, replacing any message still on screen
    fn toast(&self, message: &str);

    /// Push a freshly rendered list
    fn refresh(&self, view: &ListView);

    fn native_notification_permitted(&self) -> bool {
        false
    }

    fn native_notify(&self, _title: &str, _body: &str) -> AppResult<()> {
        Ok(())
    }

    /// Ask once for native notification permission; declines are ignored
    fn request_native_permission(&self) {}
}

/// Simulated send followed by the outcome toast
pub async fn notify(mailer: &dyn Mailer, surface: &dyn Surface, reminder: &Reminder) -> SendOutcome {
    match mailer.send(reminder).await {
        Ok(()) => {
            surface.toast(&format!("Email notification sent to {}", reminder.email));
            SendOutcome::Delivered
        }
        Err(e) => {
            error!("Error sending notification for reminder {}: {}", reminder.id, e);
            surface.toast("Failed to send email notification");
            SendOutcome::Failed
        }
    }
}

/// Raise the native notification, or fall back to a toast
pub fn alert(surface: &dyn Surface, reminder: &Reminder) {
    let fallback = format!("Reminder: {}", reminder.message);

    if !surface.native_notification_permitted() {
        surface.toast(&fallback);
        return;
    }

    if let Err(e) = surface.native_notify(NOTIFICATION_TITLE, &reminder.message) {
        warn!("Native notification failed: {}", e);
        surface.toast(&fallback);
    }
}
