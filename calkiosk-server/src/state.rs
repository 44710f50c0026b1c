use calkiosk_core::Store;
use calkiosk_provider_google::{CalendarApi, GoogleEndpoints, GoogleOAuth};
use std::sync::Arc;

use crate::config::Config;
use crate::session::SessionStore;
use crate::sync::SyncService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Store,
    pub sessions: SessionStore,
    /// `None` when no OAuth client is configured.
    pub oauth: Option<GoogleOAuth>,
    pub sync: SyncService,
}

impl AppState {
    pub fn new(config: Config, store: Store) -> Self {
        Self::with_endpoints(config, store, GoogleEndpoints::default())
    }

    /// Talk to Google at `endpoints` instead of the public API.
    pub fn with_endpoints(config: Config, store: Store, endpoints: GoogleEndpoints) -> Self {
        let oauth = config
            .google
            .clone()
            .map(|credentials| GoogleOAuth::with_endpoints(credentials, endpoints.clone()));
        let api = CalendarApi::with_base_url(&endpoints.calendar_api);

        let sync = SyncService::new(
            store.clone(),
            oauth.clone(),
            api,
            config.timezone,
            config.max_events_days,
        );

        AppState {
            sessions: SessionStore::new(&config.session_secret, config.secure_cookies),
            config: Arc::new(config),
            store,
            oauth,
            sync,
        }
    }
}
