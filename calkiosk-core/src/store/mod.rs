//! SQLite cache of the kiosk user, their calendars, events and the sync log.

mod calendars;
mod events;
mod schema;
mod sync_log;
mod users;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{KioskError, KioskResult};

/// Handle to the local database. Cheap to clone; all clones share one
/// connection.
#[derive(Clone)]
pub struct Store {
    connection: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database at `path`, creating parent directories
    /// as needed, and bring the schema up to date.
    pub fn open(path: impl AsRef<Path>) -> KioskResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "Opened database");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> KioskResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> KioskResult<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        schema::migrate(&conn)?;
        Ok(Store {
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> KioskResult<MutexGuard<'_, Connection>> {
        self.connection.lock().map_err(|_| KioskError::LockPoisoned)
    }
}

/// Map a text column that fails to parse into a rusqlite conversion error.
fn invalid_column(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        Box::new(KioskError::InvalidData(message)),
    )
}

#[cfg(test)]
fn sample_user(id: &str) -> crate::User {
    let now = chrono::Utc::now();
    crate::User {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        name: "Kiosk User".to_string(),
        picture: Some("https://example.com/me.png".to_string()),
        access_token: format!("access-{id}"),
        refresh_token: Some(format!("refresh-{id}")),
        expires_at: now + chrono::Duration::hours(1),
        created_at: now,
        updated_at: now,
    }
}
