use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};

use super::Store;
use crate::error::KioskResult;
use crate::user::User;

const USER_COLUMNS: &str = "id, email, name, picture, access_token, refresh_token, \
                            expires_at, created_at, updated_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        picture: row.get(3)?,
        access_token: row.get(4)?,
        refresh_token: row.get(5)?,
        expires_at: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

impl Store {
    /// Store `user` as the kiosk's only user. Any other user row is removed,
    /// along with its calendars and settings.
    pub fn save_user(&self, user: &User) -> KioskResult<()> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM users WHERE id != ?1", params![user.id])?;
        if removed > 0 {
            tracing::info!(removed, "Replaced previous kiosk user");
        }

        conn.execute(
            "INSERT INTO users (id, email, name, picture, access_token, refresh_token,
                                expires_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                name = excluded.name,
                picture = excluded.picture,
                access_token = excluded.access_token,
                refresh_token = COALESCE(excluded.refresh_token, users.refresh_token),
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at",
            params![
                user.id,
                user.email,
                user.name,
                user.picture,
                user.access_token,
                user.refresh_token,
                user.expires_at,
                user.created_at,
                user.updated_at,
            ],
        )?;
        Ok(())
    }

    /// The current kiosk user, if anyone has logged in.
    pub fn current_user(&self) -> KioskResult<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users ORDER BY updated_at DESC LIMIT 1"),
                [],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user(&self, id: &str) -> KioskResult<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Record refreshed tokens. A `None` refresh token keeps the stored one.
    pub fn update_tokens(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> KioskResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE users
             SET access_token = ?2,
                 refresh_token = COALESCE(?3, refresh_token),
                 expires_at = ?4,
                 updated_at = ?5
             WHERE id = ?1",
            params![user_id, access_token, refresh_token, expires_at, Utc::now()],
        )?;
        Ok(())
    }

    /// Remove every user (and, by cascade, their calendars and settings).
    pub fn delete_user(&self) -> KioskResult<usize> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM users", [])?)
    }
}
