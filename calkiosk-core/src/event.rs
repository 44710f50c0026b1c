//! Calendar events as cached by the kiosk.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::date_range::local_midnight;

/// When an event starts or ends.
///
/// All-day events carry a calendar date (the end date is exclusive, as the
/// provider sends it); timed events carry an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
}

impl EventTime {
    /// Resolve to an instant. Dates resolve to local midnight in `tz`.
    pub fn to_utc(&self, tz: &Tz) -> DateTime<Utc> {
        match self {
            EventTime::DateTime(dt) => *dt,
            EventTime::Date(d) => local_midnight(*d, tz),
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// Parse the stored representation: `YYYY-MM-DD` or RFC 3339.
    pub fn parse(s: &str) -> Option<Self> {
        if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some(EventTime::Date(d));
        }
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| EventTime::DateTime(dt.with_timezone(&Utc)))
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::DateTime(dt) => {
                write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for EventTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Confirmed => "confirmed",
            EventStatus::Tentative => "tentative",
            EventStatus::Cancelled => "cancelled",
        }
    }

    /// Unknown values are treated as confirmed.
    pub fn parse(s: &str) -> Self {
        match s {
            "tentative" => EventStatus::Tentative,
            "cancelled" => EventStatus::Cancelled,
            _ => EventStatus::Confirmed,
        }
    }
}

/// An event as fetched from the provider, ready to be written to the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub google_event_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    pub status: EventStatus,
}

impl EventRecord {
    pub fn is_all_day(&self) -> bool {
        self.start.is_date()
    }
}

/// An event as read back from the cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    pub id: i64,
    pub google_event_id: String,
    pub calendar_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: EventTime,
    pub end_time: EventTime,
    pub is_all_day: bool,
    pub status: EventStatus,
    pub sync_timestamp: DateTime<Utc>,
    #[serde(skip)]
    pub starts_at: DateTime<Utc>,
    #[serde(skip)]
    pub ends_at: DateTime<Utc>,
}

impl CalendarEvent {
    /// Whether the event intersects the half-open interval `[from, to)`.
    /// A zero-length event belongs to the interval it starts in.
    pub fn overlaps(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        if self.starts_at == self.ends_at {
            return from <= self.starts_at && self.starts_at < to;
        }
        self.starts_at < to && self.ends_at > from
    }
}
