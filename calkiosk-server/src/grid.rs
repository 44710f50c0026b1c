//! Week-at-a-glance layout: day columns split into hourly slots.

use calkiosk_core::{CalendarEvent, local_midnight};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

pub const FIRST_HOUR: u32 = 6;
pub const LAST_HOUR: u32 = 22;
pub const DEFAULT_DAYS: u32 = 5;
pub const MAX_DAYS: u32 = 14;

#[derive(Debug, Serialize)]
pub struct WeekGrid {
    pub start: NaiveDate,
    pub timezone: String,
    pub days: Vec<GridDay>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridDay {
    pub date: NaiveDate,
    pub day_name: String,
    pub day_number: u32,
    pub is_today: bool,
    pub is_weekend: bool,
    pub all_day: Vec<CalendarEvent>,
    pub slots: Vec<GridSlot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSlot {
    pub hour: u32,
    pub display_time: String,
    pub events: Vec<CalendarEvent>,
}

/// The instants covered by `days` days starting at `start`.
pub fn grid_bounds(start: NaiveDate, days: u32, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        local_midnight(start, tz),
        local_midnight(start + Duration::days(i64::from(days)), tz),
    )
}

fn local_hour(date: NaiveDate, hour: u32, tz: &Tz) -> DateTime<Utc> {
    NaiveTime::from_hms_opt(hour, 0, 0)
        .and_then(|time| tz.from_local_datetime(&date.and_time(time)).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| local_midnight(date, tz) + Duration::hours(i64::from(hour)))
}

fn display_hour(hour: u32) -> String {
    match hour {
        0 => "12 AM".to_string(),
        1..=11 => format!("{hour} AM"),
        12 => "12 PM".to_string(),
        _ => format!("{} PM", hour - 12),
    }
}

/// Lay `events` out over `days` days from `start`. Timed events land in every
/// hourly slot they overlap between FIRST_HOUR and LAST_HOUR; all-day events
/// are listed once per day they cover.
pub fn build_grid(
    events: &[CalendarEvent],
    start: NaiveDate,
    days: u32,
    tz: &Tz,
    today: NaiveDate,
) -> WeekGrid {
    let days = (0..days)
        .map(|offset| {
            let date = start + Duration::days(i64::from(offset));
            let (day_start, day_end) = grid_bounds(date, 1, tz);

            let all_day = events
                .iter()
                .filter(|e| e.is_all_day && e.overlaps(day_start, day_end))
                .cloned()
                .collect();

            let slots = (FIRST_HOUR..=LAST_HOUR)
                .map(|hour| {
                    let slot_start = local_hour(date, hour, tz);
                    let slot_end = local_hour(date, hour + 1, tz);
                    GridSlot {
                        hour,
                        display_time: display_hour(hour),
                        events: events
                            .iter()
                            .filter(|e| !e.is_all_day && e.overlaps(slot_start, slot_end))
                            .cloned()
                            .collect(),
                    }
                })
                .collect();

            GridDay {
                date,
                day_name: date.format("%a").to_string(),
                day_number: date.day(),
                is_today: date == today,
                is_weekend: matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
                all_day,
                slots,
            }
        })
        .collect();

    WeekGrid {
        start,
        timezone: tz.name().to_string(),
        days,
    }
}
