//! Pulls calendars and events from Google into the local store.

use anyhow::{Context, Result};
use calkiosk_core::constants::PRIMARY_CALENDAR_ALIAS;
use calkiosk_core::{Calendar, KioskResult, Store, SyncStatus, SyncWindow};
use calkiosk_provider_google::{CalendarApi, GoogleOAuth, GoogleSession};
use chrono::Utc;
use chrono_tz::Tz;
use serde::Serialize;

/// Result of one event sync, as reported to API callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub success: bool,
    pub events_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct SyncService {
    store: Store,
    oauth: Option<GoogleOAuth>,
    api: CalendarApi,
    timezone: Tz,
    max_events_days: i64,
}

impl SyncService {
    pub fn new(
        store: Store,
        oauth: Option<GoogleOAuth>,
        api: CalendarApi,
        timezone: Tz,
        max_events_days: i64,
    ) -> Self {
        SyncService {
            store,
            oauth,
            api,
            timezone,
            max_events_days,
        }
    }

    fn oauth(&self) -> Result<&GoogleOAuth> {
        self.oauth
            .as_ref()
            .context("Google OAuth2 not configured")
    }

    /// The calendar the kiosk shows: the selected one, else the stored
    /// primary calendar, else Google's `primary` alias.
    pub fn active_calendar(&self, user_id: &str) -> KioskResult<String> {
        if let Some(selected) = self.store.selected_calendar(user_id)? {
            return Ok(selected);
        }
        let primary = self
            .store
            .list_calendars(user_id)?
            .into_iter()
            .find(|c| c.primary)
            .map(|c| c.id);
        Ok(primary.unwrap_or_else(|| PRIMARY_CALENDAR_ALIAS.to_string()))
    }

    /// Replace the active calendar's cached events with what Google has in
    /// the sync window. Every attempt is appended to the sync log; failures
    /// are reported in the outcome rather than returned.
    pub async fn sync_events(&self) -> SyncOutcome {
        tracing::info!("Starting calendar sync");
        if let Err(e) = self.store.record_sync_status(&SyncStatus::in_progress()) {
            tracing::warn!(error = %e, "Could not record sync start");
        }

        match self.try_sync_events().await {
            Ok(count) => {
                tracing::info!(events = count, "Calendar sync completed");
                if let Err(e) = self.store.record_sync_status(&SyncStatus::success(count)) {
                    tracing::warn!(error = %e, "Could not record sync success");
                }
                SyncOutcome {
                    success: true,
                    events_count: count,
                    error: None,
                }
            }
            Err(e) => {
                let message = format!("{e:#}");
                tracing::error!(error = %message, "Calendar sync failed");
                if let Err(e) = self.store.record_sync_status(&SyncStatus::error(&message)) {
                    tracing::warn!(error = %e, "Could not record sync failure");
                }
                SyncOutcome {
                    success: false,
                    events_count: 0,
                    error: Some(message),
                }
            }
        }
    }

    async fn try_sync_events(&self) -> Result<usize> {
        let oauth = self.oauth()?;
        let mut session = GoogleSession::load_valid(&self.store, oauth).await?;
        let calendar_id = self.active_calendar(&session.user().id)?;
        let window = SyncWindow::upcoming(Utc::now(), &self.timezone, self.max_events_days);

        let api = &self.api;
        let calendar = calendar_id.as_str();
        let window = &window;
        let records = session
            .call(|token| async move { api.fetch_events(&token, calendar, window).await })
            .await
            .with_context(|| format!("Failed to fetch events for calendar {calendar_id}"))?;

        let count = self
            .store
            .replace_events(&calendar_id, &records, &self.timezone)?;
        Ok(count)
    }

    /// Replace the stored calendar list with the user's current one.
    pub async fn sync_calendars(&self) -> Result<Vec<Calendar>> {
        let oauth = self.oauth()?;
        let mut session = GoogleSession::load_valid(&self.store, oauth).await?;
        let user_id = session.user().id.clone();

        let api = &self.api;
        let owner = user_id.as_str();
        let calendars = session
            .call(|token| async move { api.fetch_calendars(&token, owner).await })
            .await
            .context("Failed to fetch calendar list")?;

        self.store.replace_calendars(&user_id, &calendars)?;
        tracing::info!(count = calendars.len(), "Synced calendar list");
        Ok(calendars)
    }

    /// Whether there is a user to sync for.
    pub fn has_user(&self) -> KioskResult<bool> {
        Ok(self.store.current_user()?.is_some())
    }
}
