//! Google Calendar provider for the calendar kiosk.
//!
//! - `oauth`: consent URL, code exchange, token refresh and userinfo
//! - `api`: calendar list and event list, paged
//! - `session`: a user's tokens, refreshed on expiry and retried once on 401

pub mod api;
pub mod app_config;
pub mod error;
pub mod from_google;
pub mod oauth;
pub mod session;
pub mod types;

pub use api::CalendarApi;
pub use app_config::{GoogleEndpoints, OAuthCredentials};
pub use error::GoogleError;
pub use oauth::{GoogleOAuth, GoogleUserInfo, TokenGrant};
pub use session::GoogleSession;
