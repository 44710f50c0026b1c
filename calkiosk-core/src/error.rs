//! Error types for the kiosk core.

use thiserror::Error;

/// Errors that can occur while reading or writing the local cache.
#[derive(Error, Debug)]
pub enum KioskError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Calendar not found: {0}")]
    CalendarNotFound(String),

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD or an RFC 3339 timestamp")]
    InvalidDate(String),

    #[error("Invalid stored value: {0}")]
    InvalidData(String),

    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

/// Result type alias for kiosk core operations.
pub type KioskResult<T> = Result<T, KioskError>;
