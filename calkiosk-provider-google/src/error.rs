//! Errors from talking to Google.

use calkiosk_core::KioskError;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GoogleError {
    #[error("Access token expired or revoked")]
    TokenExpired,

    #[error("Access denied by Google: {0}")]
    AuthRequired(String),

    #[error("Rate limited by Google, retry after {0}s")]
    RateLimited(u64),

    #[error("Google API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("OAuth token request failed: {0}")]
    OAuth(String),

    #[error("No authenticated user found")]
    NoUser,

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Invalid response from Google: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error(transparent)]
    Store(#[from] KioskError),
}

impl GoogleError {
    /// Whether a token refresh followed by a retry could succeed.
    pub fn should_refresh_token(&self) -> bool {
        matches!(self, GoogleError::TokenExpired)
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Deserialize)]
struct OAuthErrorBody {
    error: String,
    error_description: Option<String>,
}

/// Pull a human-readable message out of a Google error body.
fn error_message(body: &str) -> String {
    if let Ok(oauth) = serde_json::from_str::<OAuthErrorBody>(body) {
        return match oauth.error_description {
            Some(description) => format!("{}: {}", oauth.error, description),
            None => oauth.error,
        };
    }
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(api) => api.error.message,
        Err(_) => body.trim().to_string(),
    }
}

/// Pass successful responses through; map failures by status code.
pub(crate) async fn check_response(
    response: reqwest::Response,
) -> Result<reqwest::Response, GoogleError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(60);
    let body = response.text().await.unwrap_or_default();

    Err(match status.as_u16() {
        401 => GoogleError::TokenExpired,
        403 => GoogleError::AuthRequired(error_message(&body)),
        429 => GoogleError::RateLimited(retry_after),
        code => GoogleError::Api {
            status: code,
            message: error_message(&body),
        },
    })
}

/// Token endpoint failures are never retried with a refresh.
pub(crate) async fn check_token_response(
    response: reqwest::Response,
) -> Result<reqwest::Response, GoogleError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(GoogleError::OAuth(format!(
        "{}: {}",
        status.as_u16(),
        error_message(&body)
    )))
}
