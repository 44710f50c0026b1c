use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rusqlite::{Row, params};

use super::{Store, invalid_column};
use crate::error::KioskResult;
use crate::event::{CalendarEvent, EventRecord, EventStatus, EventTime};

const EVENT_COLUMNS: &str = "id, google_event_id, calendar_id, title, description, location, \
                             start_time, end_time, is_all_day, status, sync_timestamp, \
                             start_ts, end_ts";

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<CalendarEvent> {
    let start_time: String = row.get(6)?;
    let end_time: String = row.get(7)?;
    let status: String = row.get(9)?;
    let start_ts: i64 = row.get(11)?;
    let end_ts: i64 = row.get(12)?;

    Ok(CalendarEvent {
        id: row.get(0)?,
        google_event_id: row.get(1)?,
        calendar_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        location: row.get(5)?,
        start_time: EventTime::parse(&start_time)
            .ok_or_else(|| invalid_column(6, format!("event start '{start_time}'")))?,
        end_time: EventTime::parse(&end_time)
            .ok_or_else(|| invalid_column(7, format!("event end '{end_time}'")))?,
        is_all_day: row.get(8)?,
        status: EventStatus::parse(&status),
        sync_timestamp: row.get(10)?,
        starts_at: DateTime::from_timestamp(start_ts, 0)
            .ok_or_else(|| invalid_column(11, format!("timestamp {start_ts}")))?,
        ends_at: DateTime::from_timestamp(end_ts, 0)
            .ok_or_else(|| invalid_column(12, format!("timestamp {end_ts}")))?,
    })
}

impl Store {
    /// Replace every cached event of `calendar_id` with `records`.
    ///
    /// The delete and the inserts share one transaction, so a failed insert
    /// keeps the previous snapshot. An empty `records` leaves the calendar
    /// empty. All-day dates are resolved to instants in `tz`. Returns the
    /// number of events stored.
    pub fn replace_events(
        &self,
        calendar_id: &str,
        records: &[EventRecord],
        tz: &Tz,
    ) -> KioskResult<usize> {
        let synced_at = Utc::now();
        let mut conn = self.conn()?;

        let tx = conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM calendar_events WHERE calendar_id = ?1",
            params![calendar_id],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO calendar_events
                    (calendar_id, google_event_id, title, description, location,
                     start_time, end_time, start_ts, end_ts, is_all_day, status,
                     sync_timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for record in records {
                stmt.execute(params![
                    calendar_id,
                    record.google_event_id,
                    record.title,
                    record.description,
                    record.location,
                    record.start.to_string(),
                    record.end.to_string(),
                    record.start.to_utc(tz).timestamp(),
                    record.end.to_utc(tz).timestamp(),
                    record.is_all_day(),
                    record.status.as_str(),
                    synced_at,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!(calendar_id, removed, stored = records.len(), "Replaced cached events");
        Ok(records.len())
    }

    /// Events of `calendar_id` touching the closed range `[from, to]`,
    /// ordered by start. An event ending at `from` or starting at `to` counts.
    pub fn events_between(
        &self,
        calendar_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> KioskResult<Vec<CalendarEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM calendar_events
             WHERE calendar_id = ?1
               AND start_ts <= ?3
               AND end_ts >= ?2
             ORDER BY start_ts, id"
        ))?;
        let events = stmt
            .query_map(
                params![calendar_id, from.timestamp(), to.timestamp()],
                event_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    pub fn all_events(&self, calendar_id: &str) -> KioskResult<Vec<CalendarEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM calendar_events
             WHERE calendar_id = ?1
             ORDER BY start_ts, id"
        ))?;
        let events = stmt
            .query_map(params![calendar_id], event_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    /// Drop every cached event, across all calendars.
    pub fn clear_events(&self) -> KioskResult<usize> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM calendar_events", [])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn at(h: u32, m: u32) -> EventTime {
        EventTime::DateTime(Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap())
    }

    fn timed(id: &str, start: EventTime, end: EventTime) -> EventRecord {
        EventRecord {
            google_event_id: id.to_string(),
            title: format!("Event {id}"),
            description: None,
            location: Some("Kitchen".to_string()),
            start,
            end,
            status: EventStatus::Confirmed,
        }
    }

    fn all_day(id: &str, day: u32) -> EventRecord {
        timed(
            id,
            EventTime::Date(NaiveDate::from_ymd_opt(2025, 3, day).unwrap()),
            EventTime::Date(NaiveDate::from_ymd_opt(2025, 3, day + 1).unwrap()),
        )
    }

    fn utc(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_replace_and_read_back() {
        let store = Store::open_in_memory().unwrap();
        let stored = store
            .replace_events(
                "primary",
                &[timed("late", at(15, 0), at(16, 0)), timed("early", at(9, 0), at(9, 30))],
                &Tz::UTC,
            )
            .unwrap();
        assert_eq!(stored, 2);

        let events = store.all_events("primary").unwrap();
        let ids: Vec<_> = events.iter().map(|e| e.google_event_id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
        assert_eq!(events[0].start_time.to_string(), "2025-03-10T09:00:00Z");
        assert_eq!(events[0].location.as_deref(), Some("Kitchen"));
        assert!(!events[0].is_all_day);
    }

    #[test]
    fn test_second_sync_replaces_rather_than_merges() {
        let store = Store::open_in_memory().unwrap();
        store
            .replace_events("primary", &[timed("a", at(9, 0), at(10, 0))], &Tz::UTC)
            .unwrap();
        store
            .replace_events("primary", &[timed("b", at(11, 0), at(12, 0))], &Tz::UTC)
            .unwrap();

        let events = store.all_events("primary").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].google_event_id, "b");
    }

    #[test]
    fn test_empty_sync_clears_calendar() {
        let store = Store::open_in_memory().unwrap();
        store
            .replace_events("primary", &[timed("a", at(9, 0), at(10, 0))], &Tz::UTC)
            .unwrap();
        assert_eq!(store.replace_events("primary", &[], &Tz::UTC).unwrap(), 0);
        assert!(store.all_events("primary").unwrap().is_empty());
    }

    #[test]
    fn test_failed_insert_keeps_previous_snapshot() {
        let store = Store::open_in_memory().unwrap();
        store
            .replace_events("primary", &[timed("kept", at(9, 0), at(10, 0))], &Tz::UTC)
            .unwrap();
        store
            .conn()
            .unwrap()
            .execute_batch(
                "CREATE TEMP TRIGGER reject_bad BEFORE INSERT ON calendar_events
                 WHEN NEW.google_event_id = 'bad'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let result = store.replace_events(
            "primary",
            &[timed("fresh", at(11, 0), at(12, 0)), timed("bad", at(13, 0), at(14, 0))],
            &Tz::UTC,
        );
        assert!(result.is_err());

        let events = store.all_events("primary").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].google_event_id, "kept");
    }

    #[test]
    fn test_calendars_are_independent() {
        let store = Store::open_in_memory().unwrap();
        store
            .replace_events("work", &[timed("a", at(9, 0), at(10, 0))], &Tz::UTC)
            .unwrap();
        store
            .replace_events("home", &[timed("b", at(9, 0), at(10, 0))], &Tz::UTC)
            .unwrap();
        store.replace_events("home", &[], &Tz::UTC).unwrap();

        assert_eq!(store.all_events("work").unwrap().len(), 1);
        assert_eq!(store.clear_events().unwrap(), 1);
        assert!(store.all_events("work").unwrap().is_empty());
    }

    #[test]
    fn test_range_query_uses_overlap() {
        let store = Store::open_in_memory().unwrap();
        store
            .replace_events(
                "primary",
                &[
                    timed("before", at(6, 0), at(8, 0)),
                    timed("straddles-start", at(7, 0), at(9, 30)),
                    timed("ends-at-from", at(8, 0), at(9, 0)),
                    timed("inside", at(10, 0), at(11, 0)),
                    timed("covers", at(5, 0), at(23, 0)),
                    timed("reminder", at(12, 0), at(12, 0)),
                    timed("starts-at-to", at(13, 0), at(14, 0)),
                    timed("after", at(13, 30), at(14, 0)),
                ],
                &Tz::UTC,
            )
            .unwrap();

        let events = store
            .events_between("primary", utc(10, 9), utc(10, 13))
            .unwrap();
        let ids: Vec<_> = events.iter().map(|e| e.google_event_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "covers",
                "straddles-start",
                "ends-at-from",
                "inside",
                "reminder",
                "starts-at-to"
            ]
        );
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let store = Store::open_in_memory().unwrap();
        store
            .replace_events("primary", &[timed("lunch", at(12, 0), at(13, 0))], &Tz::UTC)
            .unwrap();

        let ending_at_start = store.events_between("primary", utc(10, 9), utc(10, 12)).unwrap();
        assert_eq!(ending_at_start.len(), 1);
        let starting_at_end = store.events_between("primary", utc(10, 13), utc(10, 14)).unwrap();
        assert_eq!(starting_at_end.len(), 1);
        assert!(
            store
                .events_between("primary", utc(10, 14), utc(10, 15))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_all_day_events_resolve_in_kiosk_timezone() {
        let store = Store::open_in_memory().unwrap();
        let tokyo: Tz = "Asia/Tokyo".parse().unwrap();
        store
            .replace_events("primary", &[all_day("holiday", 10)], &tokyo)
            .unwrap();

        let event = &store.all_events("primary").unwrap()[0];
        assert!(event.is_all_day);
        assert_eq!(event.start_time.to_string(), "2025-03-10");
        assert_eq!(event.starts_at, utc(9, 15));
        assert_eq!(event.ends_at, utc(10, 15));

        // 16:00 UTC on the 10th is already the 11th in Tokyo
        assert!(
            store
                .events_between("primary", utc(10, 16), utc(10, 20))
                .unwrap()
                .is_empty()
        );
    }
}
