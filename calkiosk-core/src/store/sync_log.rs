use rusqlite::{OptionalExtension, params};

use super::{Store, invalid_column};
use crate::error::KioskResult;
use crate::sync_status::{SyncState, SyncStatus};

impl Store {
    /// Append a row to the sync log and return its id.
    pub fn record_sync_status(&self, status: &SyncStatus) -> KioskResult<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sync_status (last_sync, status, error_message, events_synced)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                status.last_sync,
                status.status.as_str(),
                status.error_message,
                status.events_synced,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// The most recently appended sync log row.
    pub fn latest_sync_status(&self) -> KioskResult<Option<SyncStatus>> {
        let conn = self.conn()?;
        let status = conn
            .query_row(
                "SELECT id, last_sync, status, error_message, events_synced
                 FROM sync_status
                 ORDER BY id DESC
                 LIMIT 1",
                [],
                |row| {
                    let state: String = row.get(2)?;
                    Ok(SyncStatus {
                        id: row.get(0)?,
                        last_sync: row.get(1)?,
                        status: SyncState::parse(&state)
                            .ok_or_else(|| invalid_column(2, format!("sync state '{state}'")))?,
                        error_message: row.get(3)?,
                        events_synced: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(status)
    }
}
