use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

use super::Store;
use crate::calendar::Calendar;
use crate::error::{KioskError, KioskResult};

const CALENDAR_COLUMNS: &str = "id, user_id, summary, description, is_primary, access_role";

fn calendar_from_row(row: &Row<'_>) -> rusqlite::Result<Calendar> {
    Ok(Calendar {
        id: row.get(0)?,
        user_id: row.get(1)?,
        summary: row.get(2)?,
        description: row.get(3)?,
        primary: row.get(4)?,
        access_role: row.get(5)?,
    })
}

impl Store {
    /// Replace the stored calendar list of `user_id` with `calendars`.
    /// The selected calendar setting is left untouched.
    pub fn replace_calendars(&self, user_id: &str, calendars: &[Calendar]) -> KioskResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM calendars WHERE user_id = ?1", params![user_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO calendars
                    (id, user_id, summary, description, is_primary, access_role)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for calendar in calendars {
                stmt.execute(params![
                    calendar.id,
                    user_id,
                    calendar.summary,
                    calendar.description,
                    calendar.primary,
                    calendar.access_role,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Calendars of `user_id`, primary first, then by name.
    pub fn list_calendars(&self, user_id: &str) -> KioskResult<Vec<Calendar>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CALENDAR_COLUMNS} FROM calendars
             WHERE user_id = ?1
             ORDER BY is_primary DESC, summary COLLATE NOCASE"
        ))?;
        let calendars = stmt
            .query_map(params![user_id], calendar_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(calendars)
    }

    pub fn get_calendar(&self, user_id: &str, calendar_id: &str) -> KioskResult<Option<Calendar>> {
        let conn = self.conn()?;
        let calendar = conn
            .query_row(
                &format!("SELECT {CALENDAR_COLUMNS} FROM calendars WHERE user_id = ?1 AND id = ?2"),
                params![user_id, calendar_id],
                calendar_from_row,
            )
            .optional()?;
        Ok(calendar)
    }

    /// Remember `calendar_id` as the calendar the kiosk displays.
    /// Fails with [`KioskError::CalendarNotFound`] unless it is in the stored list.
    pub fn set_selected_calendar(&self, user_id: &str, calendar_id: &str) -> KioskResult<()> {
        if self.get_calendar(user_id, calendar_id)?.is_none() {
            return Err(KioskError::CalendarNotFound(calendar_id.to_string()));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO user_settings (user_id, selected_calendar_id, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                selected_calendar_id = excluded.selected_calendar_id,
                updated_at = excluded.updated_at",
            params![user_id, calendar_id, Utc::now()],
        )?;
        Ok(())
    }

    pub fn selected_calendar(&self, user_id: &str) -> KioskResult<Option<String>> {
        let conn = self.conn()?;
        let selected = conn
            .query_row(
                "SELECT selected_calendar_id FROM user_settings WHERE user_id = ?1",
                params![user_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(selected.flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::sample_user;

    fn calendar(id: &str, summary: &str, primary: bool) -> Calendar {
        Calendar {
            id: id.to_string(),
            user_id: "u1".to_string(),
            summary: summary.to_string(),
            description: None,
            primary,
            access_role: "owner".to_string(),
        }
    }

    fn store_with_user() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.save_user(&sample_user("u1")).unwrap();
        store
    }

    #[test]
    fn test_list_orders_primary_first() {
        let store = store_with_user();
        store
            .replace_calendars(
                "u1",
                &[
                    calendar("b", "birthdays", false),
                    calendar("me", "Me", true),
                    calendar("a", "Archive", false),
                ],
            )
            .unwrap();

        let ids: Vec<_> = store
            .list_calendars("u1")
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["me", "a", "b"]);
    }

    #[test]
    fn test_replace_is_a_snapshot() {
        let store = store_with_user();
        store
            .replace_calendars("u1", &[calendar("a", "A", true), calendar("b", "B", false)])
            .unwrap();
        store
            .replace_calendars("u1", &[calendar("c", "C", true)])
            .unwrap();

        let calendars = store.list_calendars("u1").unwrap();
        assert_eq!(calendars.len(), 1);
        assert_eq!(calendars[0].id, "c");
    }

    #[test]
    fn test_select_unknown_calendar_fails() {
        let store = store_with_user();
        let err = store.set_selected_calendar("u1", "missing").unwrap_err();
        assert!(matches!(err, KioskError::CalendarNotFound(id) if id == "missing"));
        assert!(store.selected_calendar("u1").unwrap().is_none());
    }

    #[test]
    fn test_selection_survives_calendar_resync() {
        let store = store_with_user();
        store
            .replace_calendars("u1", &[calendar("work", "Work", false)])
            .unwrap();
        store.set_selected_calendar("u1", "work").unwrap();
        store
            .replace_calendars("u1", &[calendar("work", "Work (renamed)", false)])
            .unwrap();

        assert_eq!(store.selected_calendar("u1").unwrap().as_deref(), Some("work"));
    }

    #[test]
    fn test_deleting_user_cascades() {
        let store = store_with_user();
        store
            .replace_calendars("u1", &[calendar("work", "Work", false)])
            .unwrap();
        store.set_selected_calendar("u1", "work").unwrap();

        store.delete_user().unwrap();
        assert!(store.list_calendars("u1").unwrap().is_empty());
        assert!(store.selected_calendar("u1").unwrap().is_none());
    }
}
