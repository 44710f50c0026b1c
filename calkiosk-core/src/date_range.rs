//! Sync window and date parameters.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::constants::DEFAULT_SYNC_DAYS;
use crate::error::{KioskError, KioskResult};

/// The span of time pulled from the provider on each sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl Default for SyncWindow {
    /// Default window: today through DEFAULT_SYNC_DAYS, in UTC
    fn default() -> Self {
        SyncWindow::upcoming(Utc::now(), &Tz::UTC, DEFAULT_SYNC_DAYS)
    }
}

impl SyncWindow {
    /// From local midnight of the current day through `days` days later.
    pub fn upcoming(now: DateTime<Utc>, tz: &Tz, days: i64) -> Self {
        let today = now.with_timezone(tz).date_naive();
        SyncWindow {
            from: local_midnight(today, tz),
            to: local_midnight(today + Duration::days(days), tz),
        }
    }

    pub fn from_rfc3339(&self) -> String {
        self.from.to_rfc3339()
    }

    pub fn to_rfc3339(&self) -> String {
        self.to.to_rfc3339()
    }
}

/// Midnight at the start of `date` in `tz`, as an instant.
///
/// When midnight does not exist locally (DST gap) the earliest valid time of
/// that day is used; UTC midnight is the last resort.
pub fn local_midnight(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

/// Parse a range start: `YYYY-MM-DD` means local midnight of that day.
pub fn parse_range_start(s: &str, tz: &Tz) -> KioskResult<DateTime<Utc>> {
    match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        Ok(date) => Ok(local_midnight(date, tz)),
        Err(_) => parse_instant(s),
    }
}

/// Parse an inclusive range end: `YYYY-MM-DD` means the last second of that
/// day, so nothing starting at the next local midnight is included.
pub fn parse_range_end(s: &str, tz: &Tz) -> KioskResult<DateTime<Utc>> {
    match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        Ok(date) => Ok(local_midnight(date + Duration::days(1), tz) - Duration::seconds(1)),
        Err(_) => parse_instant(s),
    }
}

fn parse_instant(s: &str) -> KioskResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| KioskError::InvalidDate(s.to_string()))
}
