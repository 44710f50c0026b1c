//! Google Calendar v3 REST calls.

use calkiosk_core::{Calendar, EventRecord, SyncWindow};

use crate::app_config::GOOGLE_CALENDAR_API;
use crate::error::{GoogleError, check_response};
use crate::from_google::{FromGoogle, calendar_from_google};
use crate::types::{CalendarListEntry, CalendarListResponse, EventsResponse, GoogleEvent};

const PAGE_SIZE: &str = "250";

/// Stops paging if Google keeps handing out tokens.
const MAX_PAGES: usize = 40;

#[derive(Clone)]
pub struct CalendarApi {
    client: reqwest::Client,
    base_url: String,
}

impl Default for CalendarApi {
    fn default() -> Self {
        Self::with_base_url(GOOGLE_CALENDAR_API)
    }
}

impl CalendarApi {
    pub fn with_base_url(base_url: &str) -> Self {
        CalendarApi {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the user's calendar list as kiosk calendars owned by `user_id`.
    #[tracing::instrument(skip(self, access_token), level = "info")]
    pub async fn fetch_calendars(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<Calendar>, GoogleError> {
        let entries = self.list_calendars(access_token).await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| calendar_from_google(entry, user_id))
            .collect())
    }

    /// Fetch the events of `calendar_id` in `window`, with recurring events
    /// expanded into instances. Cancelled and undated events are skipped.
    #[tracing::instrument(skip(self, access_token), level = "info")]
    pub async fn fetch_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        window: &SyncWindow,
    ) -> Result<Vec<EventRecord>, GoogleError> {
        let events = self.list_events(access_token, calendar_id, window).await?;

        let mut records = Vec::with_capacity(events.len());
        for event in events {
            if event.status.as_deref() == Some("cancelled") {
                continue;
            }
            let id = event.id.clone();
            match EventRecord::from_google(event) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(event_id = %id, error = %e, "Skipping event"),
            }
        }
        Ok(records)
    }

    pub async fn list_calendars(
        &self,
        access_token: &str,
    ) -> Result<Vec<CalendarListEntry>, GoogleError> {
        let url = format!("{}/users/me/calendarList", self.base_url);
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut request = self
                .client
                .get(&url)
                .bearer_auth(access_token)
                .query(&[("maxResults", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: CalendarListResponse = check_response(request.send().await?)
                .await?
                .json()
                .await?;
            entries.extend(page.items);

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        if page_token.is_some() {
            tracing::warn!(
                pages = MAX_PAGES,
                count = entries.len(),
                "Calendar list truncated at page limit"
            );
        }
        Ok(entries)
    }

    pub async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        window: &SyncWindow,
    ) -> Result<Vec<GoogleEvent>, GoogleError> {
        let url = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        );
        let time_min = window.from_rfc3339();
        let time_max = window.to_rfc3339();
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut request = self.client.get(&url).bearer_auth(access_token).query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("maxResults", PAGE_SIZE),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: EventsResponse = check_response(request.send().await?)
                .await?
                .json()
                .await?;
            events.extend(page.items);

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        if page_token.is_some() {
            tracing::warn!(
                calendar_id,
                pages = MAX_PAGES,
                count = events.len(),
                "Event list truncated at page limit"
            );
        }

        tracing::debug!(calendar_id, count = events.len(), "Listed events");
        Ok(events)
    }
}
