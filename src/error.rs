use serde::Serialize;
use std::fmt;

/// Application error types. `Display` doubles as the toast text shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    /// A compose field was empty, blank or unreadable
    MissingField,
    /// The email address is not shaped like `local@domain.tld`
    InvalidEmail,
    /// The scheduled date and time is not after the submission time
    NotFuture,
    /// Errors writing the reminder file
    Storage(String),
    /// The saved reminder file could not be parsed
    PersistenceRead(String),
    /// Email delivery failed
    Send(String),
    /// Errors related to window management
    Window(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::MissingField => write!(f, "Please fill in all fields"),
            AppError::InvalidEmail => write!(f, "Please enter a valid email address"),
            AppError::NotFuture => write!(f, "Please select a future date and time"),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::PersistenceRead(msg) => write!(f, "Saved reminders unreadable: {}", msg),
            AppError::Send(msg) => write!(f, "Send error: {}", msg),
            AppError::Window(msg) => write!(f, "Window error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

// Conversion to String for Tauri command return types
impl From<AppError> for String {
    fn from(error: AppError) -> Self {
        error.to_string()
    }
}

// Convenience constructors
impl AppError {
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        AppError::Storage(msg.into())
    }

    pub fn persistence_read<S: Into<String>>(msg: S) -> Self {
        AppError::PersistenceRead(msg.into())
    }

    pub fn send<S: Into<String>>(msg: S) -> Self {
        AppError::Send(msg.into())
    }

    pub fn window<S: Into<String>>(msg: S) -> Self {
        AppError::Window(msg.into())
    }

    /// User input problems; the form is kept for correction
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::MissingField | AppError::InvalidEmail | AppError::NotFuture
        )
    }
}

/// Result type alias for commands
pub type AppResult<T> = Result<T, AppError>;
