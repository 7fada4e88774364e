use crate::config::STORAGE_FILE;
use crate::error::{AppError, AppResult};
use crate::reminder::Reminder;
use std::fs;
use std::path::Path;

/// Load reminders from the local JSON slot.
///
/// A missing file is an empty store. Unreadable or malformed content is reported
/// as `PersistenceRead` so the caller can decide to start empty.
pub fn load_local(app_data_path: &Path) -> AppResult<Vec<Reminder>> {
    let path = app_data_path.join(STORAGE_FILE);

    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&path).map_err(|e| AppError::persistence_read(e.to_string()))?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str::<Vec<Reminder>>(&content)
        .map_err(|e| AppError::persistence_read(e.to_string()))
}

/// Rewrite the whole slot with the given sequence
pub fn save_local(app_data_path: &Path, reminders: &[Reminder]) -> AppResult<()> {
    fs::create_dir_all(app_data_path).map_err(|e| AppError::storage(e.to_string()))?;
    let path = app_data_path.join(STORAGE_FILE);
    let content = serde_json::to_string_pretty(reminders).map_err(|e| AppError::storage(e.to_string()))?;
    fs::write(&path, content).map_err(|e| AppError::storage(e.to_string()))?;
    Ok(())
}
