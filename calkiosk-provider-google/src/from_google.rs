//! Conversion from Google wire types into kiosk types.

use calkiosk_core::constants::DEFAULT_EVENT_TITLE;
use calkiosk_core::{Calendar, EventRecord, EventStatus, EventTime};
use chrono::Utc;

use crate::error::GoogleError;
use crate::types::{CalendarListEntry, GoogleEvent, GoogleEventTime};

const UNTITLED_CALENDAR: &str = "Untitled Calendar";
const DEFAULT_ACCESS_ROLE: &str = "reader";

pub trait FromGoogle<T> {
    fn from_google(value: T) -> Result<Self, GoogleError>
    where
        Self: Sized;
}

fn event_time(time: &Option<GoogleEventTime>, which: &str) -> Result<EventTime, GoogleError> {
    match time {
        Some(GoogleEventTime {
            date_time: Some(dt),
            ..
        }) => Ok(EventTime::DateTime(dt.with_timezone(&Utc))),
        Some(GoogleEventTime { date: Some(d), .. }) => Ok(EventTime::Date(*d)),
        _ => Err(GoogleError::InvalidResponse(format!("Event has no {which} time"))),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl FromGoogle<GoogleEvent> for EventRecord {
    fn from_google(event: GoogleEvent) -> Result<Self, GoogleError> {
        let start = event_time(&event.start, "start")?;
        let end = event_time(&event.end, "end")?;

        Ok(EventRecord {
            title: non_empty(event.summary).unwrap_or_else(|| DEFAULT_EVENT_TITLE.to_string()),
            description: non_empty(event.description),
            location: non_empty(event.location),
            status: EventStatus::parse(event.status.as_deref().unwrap_or_default()),
            google_event_id: event.id,
            start,
            end,
        })
    }
}

/// A calendar list entry as a kiosk calendar owned by `user_id`.
/// Entries without an id are dropped.
pub fn calendar_from_google(entry: CalendarListEntry, user_id: &str) -> Option<Calendar> {
    if entry.id.is_empty() {
        return None;
    }

    let summary = non_empty(entry.summary_override)
        .or(non_empty(entry.summary))
        .unwrap_or_else(|| UNTITLED_CALENDAR.to_string());

    Some(Calendar {
        id: entry.id,
        user_id: user_id.to_string(),
        summary,
        description: non_empty(entry.description),
        primary: entry.primary,
        access_role: entry
            .access_role
            .unwrap_or_else(|| DEFAULT_ACCESS_ROLE.to_string()),
    })
}
