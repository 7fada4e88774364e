mod clock;
mod config;
mod controller;
mod error;
mod notifier;
mod reminder;
mod scheduler;
mod storage;
mod validate;
mod view;

use std::sync::Arc;

use chrono::Local;
use log::{info, warn};
use serde::Serialize;
use tauri::{
    menu::{Menu, MenuItem},
    tray::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent},
    Emitter, Manager,
};
use tauri_plugin_notification::{NotificationExt, PermissionState};

use clock::SystemClock;
use config::{Settings, MAIN_WINDOW, REMINDERS_CHANGED_EVENT, STARTUP_FLAG, TOAST_EVENT};
use controller::{ReminderApp, ReminderService};
use error::{AppError, AppResult};
use notifier::{SimulatedMailer, Surface};
use reminder::Draft;
use storage::Storage;
use view::{ListView, Tab, Toast};

/// Pushes toasts, list updates and OS notifications to the running app
struct TauriSurface {
    app: tauri::AppHandle,
}

impl Surface for TauriSurface {
    fn toast(&self, message: &str) {
        if let Err(e) = self.app.emit(TOAST_EVENT, Toast::new(message)) {
            warn!("Failed to emit toast: {:?}", e);
        }
    }

    fn refresh(&self, view: &ListView) {
        if let Err(e) = self.app.emit(REMINDERS_CHANGED_EVENT, view.clone()) {
            warn!("Failed to emit {}: {:?}", REMINDERS_CHANGED_EVENT, e);
        }
    }

    fn native_notification_permitted(&self) -> bool {
        matches!(
            self.app.notification().permission_state(),
            Ok(PermissionState::Granted)
        )
    }

    fn native_notify(&self, title: &str, body: &str) -> AppResult<()> {
        self.app
            .notification()
            .builder()
            .title(title)
            .body(body)
            .show()
            .map_err(|e| AppError::window(e.to_string()))
    }

    fn request_native_permission(&self) {
        match self.app.notification().permission_state() {
            Ok(PermissionState::Granted) => {}
            Ok(_) => match self.app.notification().request_permission() {
                Ok(state) => info!(
                    "Notification permission granted: {}",
                    matches!(state, PermissionState::Granted)
                ),
                Err(e) => warn!("Notification permission request failed: {}", e),
            },
            Err(e) => warn!("Native notifications unavailable: {}", e),
        }
    }
}

pub struct AppState {
    pub service: Arc<ReminderService>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ComposeDefaults {
    min_date: String,
}

#[tauri::command]
fn get_view(state: tauri::State<AppState>) -> Result<ListView, String> {
    Ok(state.service.view())
}

#[tauri::command]
fn compose_defaults() -> ComposeDefaults {
    ComposeDefaults {
        min_date: Local::now().date_naive().format("%Y-%m-%d").to_string(),
    }
}

// Async so the timer is spawned on the runtime
#[tauri::command]
async fn submit_reminder(state: tauri::State<'_, AppState>, draft: Draft) -> Result<ListView, String> {
    state.service.submit(&draft).map_err(String::from)
}

#[tauri::command]
fn switch_tab(state: tauri::State<AppState>, tab: Tab) -> Result<ListView, String> {
    Ok(state.service.switch_tab(tab))
}

#[tauri::command]
fn toggle_selection(state: tauri::State<AppState>, id: i64, checked: bool) -> Result<ListView, String> {
    Ok(state.service.toggle_selection(id, checked))
}

#[tauri::command]
fn set_select_all(state: tauri::State<AppState>, checked: bool) -> Result<ListView, String> {
    Ok(state.service.set_select_all(checked))
}

#[tauri::command]
fn delete_reminder(state: tauri::State<AppState>, id: i64) -> Result<ListView, String> {
    state.service.delete_one(id).map_err(String::from)
}

#[tauri::command]
fn delete_selected(state: tauri::State<AppState>) -> Result<ListView, String> {
    state.service.delete_selected().map_err(String::from)
}

fn show_main_window<R: tauri::Runtime>(app: &tauri::AppHandle<R>) {
    if let Some(window) = app.get_webview_window(MAIN_WINDOW) {
        let _ = window.show();
        let _ = window.set_focus();
    }
}

fn build_tray(app: &tauri::App) -> tauri::Result<()> {
    let show_i = MenuItem::with_id(app, "show", "Show Reminders", true, None::<&str>)?;
    let quit_i = MenuItem::with_id(app, "quit", "Quit", true, None::<&str>)?;
    let menu = Menu::with_items(app, &[&show_i, &quit_i])?;

    let mut tray = TrayIconBuilder::new()
        .menu(&menu)
        .show_menu_on_left_click(false)
        .tooltip("Email Reminders")
        .on_menu_event(|app, event| match event.id.as_ref() {
            "show" => show_main_window(app),
            "quit" => app.exit(0),
            _ => {}
        })
        .on_tray_icon_event(|tray, event| {
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } = event
            {
                show_main_window(tray.app_handle());
            }
        });

    if let Some(icon) = app.default_window_icon() {
        tray = tray.icon(icon.clone());
    }
    tray.build(app)?;

    Ok(())
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(config::LOG_ENV, config::DEFAULT_LOG_LEVEL),
    )
    .init();

    let settings = Settings::from_env();
    info!("Starting Email Reminders, data in {:?}", settings.data_dir);

    let reminders = ReminderApp::new(Storage::load(settings.data_dir.clone()));

    tauri::Builder::default()
        .plugin(tauri_plugin_notification::init())
        .plugin(tauri_plugin_autostart::init(
            tauri_plugin_autostart::MacosLauncher::LaunchAgent,
            Some(vec![STARTUP_FLAG]),
        ))
        .setup(move |app| {
            let surface = Arc::new(TauriSurface {
                app: app.handle().clone(),
            });
            let service = ReminderService::new(
                reminders,
                Arc::new(SimulatedMailer::new(settings.send_latency)),
                surface.clone(),
                Arc::new(SystemClock),
                settings.fire_stale,
            );
            app.manage(AppState {
                service: Arc::clone(&service),
            });

            build_tray(app)?;

            if settings.autostart {
                use tauri_plugin_autostart::ManagerExt;
                if let Err(e) = app.autolaunch().enable() {
                    warn!("Failed to enable autostart: {}", e);
                }
            }

            // Launched at login: stay in the tray, just re-arm timers
            let launched_hidden = std::env::args().any(|arg| arg == STARTUP_FLAG);
            if !launched_hidden {
                show_main_window(app.handle());
            }

            tauri::async_runtime::spawn(async move {
                surface.request_native_permission();
                service.rehydrate();
            });

            Ok(())
        })
        .on_window_event(|window, event| {
            // Keep running in the tray so armed timers still fire
            if let tauri::WindowEvent::CloseRequested { api, .. } = event {
                if window.label() == MAIN_WINDOW {
                    api.prevent_close();
                    if let Err(e) = window.hide() {
                        warn!("Failed to hide main window: {}", e);
                    }
                }
            }
        })
        .invoke_handler(tauri::generate_handler![
            get_view,
            compose_defaults,
            submit_reminder,
            switch_tab,
            toggle_selection,
            set_select_all,
            delete_reminder,
            delete_selected,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
