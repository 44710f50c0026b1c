//! Server configuration from the environment.
//!
//! ## Environment Variables
//! - `HOST`, `PORT`: listen address (default `0.0.0.0:3001`)
//! - `DB_PATH`: SQLite file (default `./data/calendar.db`)
//! - `SYNC_INTERVAL_MINUTES`: background sync period (default 15)
//! - `MAX_EVENTS_DAYS`: how many days ahead each sync pulls (default 30)
//! - `KIOSK_TIMEZONE`: IANA zone for all-day events and dates (default UTC)
//! - `SESSION_SECRET`: key used to sign session cookies
//! - `COOKIE_SECURE`: mark cookies `Secure` (default false)
//! - `CORS_ORIGIN`: allow this browser origin, with credentials
//! - `FRONTEND_URL`: where the OAuth callback sends the browser (default `/`)
//! - `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`, `GOOGLE_REDIRECT_URI`: OAuth client

use anyhow::{Result, bail};
use calkiosk_core::constants::DEFAULT_SYNC_DAYS;
use calkiosk_provider_google::OAuthCredentials;
use chrono_tz::Tz;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_DB_PATH: &str = "./data/calendar.db";
pub const DEFAULT_SYNC_INTERVAL_MINUTES: u64 = 15;

/// Used when `SESSION_SECRET` is unset. Fine on a private kiosk, never on
/// anything reachable from outside.
const FALLBACK_SESSION_SECRET: &str = "calkiosk-insecure-session-secret";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub database_path: PathBuf,
    pub sync_interval: Duration,
    pub max_events_days: i64,
    pub timezone: Tz,
    pub session_secret: String,
    pub secure_cookies: bool,
    pub cors_origin: Option<String>,
    pub frontend_url: String,
    pub google: Option<OAuthCredentials>,
}

impl Config {
    /// Load from the process environment, after reading `.env` if present.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::info!(path = %path.display(), "Loaded environment file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = parse_or(var("HOST"), "HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?;
        let port = parse_or(var("PORT"), "PORT", DEFAULT_PORT)?;

        let sync_minutes: u64 = parse_or(
            var("SYNC_INTERVAL_MINUTES"),
            "SYNC_INTERVAL_MINUTES",
            DEFAULT_SYNC_INTERVAL_MINUTES,
        )?;
        if sync_minutes == 0 {
            bail!("Invalid SYNC_INTERVAL_MINUTES '0': must be at least 1");
        }

        let max_events_days: i64 =
            parse_or(var("MAX_EVENTS_DAYS"), "MAX_EVENTS_DAYS", DEFAULT_SYNC_DAYS)?;
        if max_events_days < 1 {
            bail!("Invalid MAX_EVENTS_DAYS '{max_events_days}': must be at least 1");
        }

        let timezone = match var("KIOSK_TIMEZONE") {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|e| anyhow::anyhow!("Invalid KIOSK_TIMEZONE '{name}': {e}"))?,
            None => Tz::UTC,
        };

        let session_secret = var("SESSION_SECRET").unwrap_or_else(|| {
            tracing::warn!("SESSION_SECRET is not set; using an insecure built-in secret");
            FALLBACK_SESSION_SECRET.to_string()
        });

        let google = match (
            var("GOOGLE_CLIENT_ID"),
            var("GOOGLE_CLIENT_SECRET"),
            var("GOOGLE_REDIRECT_URI"),
        ) {
            (Some(client_id), Some(client_secret), Some(redirect_uri)) => Some(OAuthCredentials {
                client_id,
                client_secret,
                redirect_uri,
            }),
            _ => {
                tracing::warn!(
                    "Google OAuth2 not configured. Set GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET \
                     and GOOGLE_REDIRECT_URI to enable login"
                );
                None
            }
        };

        Ok(Config {
            host,
            port,
            database_path: var("DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            sync_interval: Duration::from_secs(sync_minutes * 60),
            max_events_days,
            timezone,
            session_secret,
            secure_cookies: parse_bool(var("COOKIE_SECURE"), "COOKIE_SECURE", false)?,
            cors_origin: var("CORS_ORIGIN"),
            frontend_url: var("FRONTEND_URL").unwrap_or_else(|| "/".to_string()),
            google,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {key} '{raw}': {e}")),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>, key: &str, default: bool) -> Result<bool> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => bail!("Invalid {key} '{other}': expected true or false"),
    }
}
