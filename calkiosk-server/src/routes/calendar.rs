//! Calendar, event and sync endpoints. All of them need a logged-in session.

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use calkiosk_core::{
    Calendar, CalendarEvent, KioskError, SyncStatus, parse_range_end, parse_range_start,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::grid::{self, WeekGrid};
use crate::routes::AppError;
use crate::session::Session;
use crate::state::AppState;
use crate::sync::SyncOutcome;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/calendar/events", get(events_in_range))
        .route("/api/calendar/events/all", get(all_events))
        .route("/api/calendar/sync", post(sync_now))
        .route("/api/calendar/sync/status", get(sync_status))
        .route("/api/calendar/calendars", get(list_calendars))
        .route("/api/calendar/calendars/sync", post(sync_calendars))
        .route("/api/calendar/calendars/selected", get(selected_calendar))
        .route("/api/calendar/calendars/{id}/select", post(select_calendar))
        .route("/api/calendar/grid", get(week_grid))
        .route_layer(middleware::from_fn(require_auth))
}

async fn require_auth(session: Session, request: Request, next: Next) -> Response {
    if !session.is_authenticated() {
        return AppError::unauthorized().into_response();
    }
    next.run(request).await
}

fn session_user(session: &Session) -> Result<String, AppError> {
    session.user_id().ok_or_else(AppError::unauthorized)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeParams {
    start_date: Option<String>,
    end_date: Option<String>,
}

/// GET /api/calendar/events?startDate&endDate - Cached events overlapping a range
async fn events_in_range(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<CalendarEvent>>, AppError> {
    let user_id = session_user(&session)?;
    let (Some(start), Some(end)) = (params.start_date, params.end_date) else {
        return Err(AppError::bad_request("startDate and endDate are required"));
    };

    let tz = &state.config.timezone;
    let from = parse_range_start(&start, tz).map_err(|e| AppError::bad_request(e.to_string()))?;
    let to = parse_range_end(&end, tz).map_err(|e| AppError::bad_request(e.to_string()))?;
    if to < from {
        return Err(AppError::bad_request("endDate must not be before startDate"));
    }

    let calendar_id = state.sync.active_calendar(&user_id)?;
    Ok(Json(state.store.events_between(&calendar_id, from, to)?))
}

/// GET /api/calendar/events/all - Every cached event of the active calendar
async fn all_events(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<CalendarEvent>>, AppError> {
    let user_id = session_user(&session)?;
    let calendar_id = state.sync.active_calendar(&user_id)?;
    Ok(Json(state.store.all_events(&calendar_id)?))
}

/// POST /api/calendar/sync - Sync events from Google now
async fn sync_now(State(state): State<AppState>) -> Json<SyncOutcome> {
    Json(state.sync.sync_events().await)
}

/// GET /api/calendar/sync/status - The latest sync log entry
async fn sync_status(State(state): State<AppState>) -> Result<Json<Option<SyncStatus>>, AppError> {
    Ok(Json(state.store.latest_sync_status()?))
}

/// GET /api/calendar/calendars - Stored calendar list
async fn list_calendars(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<Calendar>>, AppError> {
    let user_id = session_user(&session)?;
    Ok(Json(state.store.list_calendars(&user_id)?))
}

/// POST /api/calendar/calendars/sync - Refresh the calendar list from Google
async fn sync_calendars(State(state): State<AppState>) -> Result<Json<Vec<Calendar>>, AppError> {
    Ok(Json(state.sync.sync_calendars().await?))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SelectedCalendar {
    selected_calendar_id: Option<String>,
}

/// GET /api/calendar/calendars/selected - The calendar chosen for display
async fn selected_calendar(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<SelectedCalendar>, AppError> {
    let user_id = session_user(&session)?;
    Ok(Json(SelectedCalendar {
        selected_calendar_id: state.store.selected_calendar(&user_id)?,
    }))
}

/// POST /api/calendar/calendars/:id/select - Choose the calendar to display
async fn select_calendar(
    State(state): State<AppState>,
    session: Session,
    Path(calendar_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let user_id = session_user(&session)?;

    match state.store.set_selected_calendar(&user_id, &calendar_id) {
        Ok(()) => {
            tracing::info!(calendar_id, "Selected calendar");
            Ok(Json(json!({ "success": true })))
        }
        Err(e @ KioskError::CalendarNotFound(_)) => Err(AppError::not_found(e.to_string())),
        Err(e) => Err(e.into()),
    }
}

#[derive(Deserialize)]
struct GridParams {
    start: Option<String>,
    days: Option<String>,
}

/// GET /api/calendar/grid?start&days - Events laid out as day columns of hourly slots
async fn week_grid(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<GridParams>,
) -> Result<Json<WeekGrid>, AppError> {
    let user_id = session_user(&session)?;
    let tz = &state.config.timezone;
    let today = Utc::now().with_timezone(tz).date_naive();

    let start = match params.start.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| AppError::bad_request(format!("Invalid start '{raw}'. Expected YYYY-MM-DD")))?,
        None => today,
    };
    let days = match params.days.as_deref() {
        Some(raw) => raw.parse::<u32>().ok().filter(|d| (1..=grid::MAX_DAYS).contains(d)),
        None => Some(grid::DEFAULT_DAYS),
    }
    .ok_or_else(|| {
        AppError::bad_request(format!("days must be between 1 and {}", grid::MAX_DAYS))
    })?;

    let calendar_id = state.sync.active_calendar(&user_id)?;
    let (from, to) = grid::grid_bounds(start, days, tz);
    let events = state.store.events_between(&calendar_id, from, to)?;

    Ok(Json(grid::build_grid(&events, start, days, tz, today)))
}
