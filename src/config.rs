//! Application configuration
//!
//! Fixed constants plus the few knobs that can be overridden from the environment
//! (or a `.env` file).

use log::warn;
use std::path::PathBuf;
use std::time::Duration;

/// Directory name under the platform's local data dir
pub const APP_DIR_NAME: &str = "EmailReminders";

/// The single persisted slot holding every reminder
pub const STORAGE_FILE: &str = "reminders.json";

/// Artificial latency of the simulated email send
pub const SEND_LATENCY_MS: u64 = 1000;

/// How long a toast stays on screen
pub const TOAST_DURATION_MS: u64 = 3000;

/// Title of the native OS notification
pub const NOTIFICATION_TITLE: &str = "Reminder";

/// Frontend event carrying a fresh list view
pub const REMINDERS_CHANGED_EVENT: &str = "reminders-changed";

/// Frontend event carrying a toast
pub const TOAST_EVENT: &str = "toast";

pub const MAIN_WINDOW: &str = "main";

/// Launch flag used by autostart; keeps the window hidden
pub const STARTUP_FLAG: &str = "--startup";

pub const LOG_ENV: &str = "REMINDERS_LOG";
pub const DEFAULT_LOG_LEVEL: &str = "info";

const DATA_DIR_ENV: &str = "REMINDERS_DATA_DIR";
const SEND_LATENCY_ENV: &str = "REMINDERS_SEND_LATENCY_MS";
const FIRE_STALE_ENV: &str = "REMINDERS_FIRE_STALE";
const AUTOSTART_ENV: &str = "REMINDERS_AUTOSTART";

#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub send_latency: Duration,
    /// Fire pending reminders whose time passed while the app was closed
    pub fire_stale: bool,
    /// Register the app to launch at login
    pub autostart: bool,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup(DATA_DIR_ENV)
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let send_latency_ms = match lookup(SEND_LATENCY_ENV) {
            Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
                warn!("Ignoring {}={:?}, using {}", SEND_LATENCY_ENV, raw, SEND_LATENCY_MS);
                SEND_LATENCY_MS
            }),
            None => SEND_LATENCY_MS,
        };

        Self {
            data_dir,
            send_latency: Duration::from_millis(send_latency_ms),
            fire_stale: parse_flag(FIRE_STALE_ENV, lookup(FIRE_STALE_ENV), true),
            autostart: parse_flag(AUTOSTART_ENV, lookup(AUTOSTART_ENV), false),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| {
            warn!("No local data dir on this platform, falling back to temp dir");
            std::env::temp_dir()
        })
        .join(APP_DIR_NAME)
}

fn parse_flag(key: &str, raw: Option<String>, default: bool) -> bool {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!("Ignoring {}={:?}, using {}", key, raw, default);
            default
        }
    }
}
