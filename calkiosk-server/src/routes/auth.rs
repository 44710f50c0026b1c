//! OAuth login, callback, status and logout endpoints

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
};
use calkiosk_core::{User, UserProfile};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::routes::AppError;
use crate::session::Session;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", get(login))
        .route("/api/auth/callback", get(callback))
        .route("/api/auth/status", get(status))
        .route("/api/auth/logout", post(logout))
}

/// GET /api/auth/login - Redirect to Google's consent page
async fn login(State(state): State<AppState>, session: Session) -> Result<Redirect, AppError> {
    let Some(oauth) = &state.oauth else {
        return Err(AppError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Google OAuth2 not configured. Please set GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET, \
             and GOOGLE_REDIRECT_URI environment variables.",
        ));
    };

    let csrf_state = Uuid::new_v4().to_string();
    let url = oauth.authorization_url(&csrf_state)?;
    session.set_oauth_state(csrf_state);

    Ok(Redirect::to(&url))
}

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Send the browser back to the dashboard with `key=value` appended.
fn to_frontend(frontend_url: &str, key: &str, value: &str) -> Redirect {
    let separator = if frontend_url.contains('?') { '&' } else { '?' };
    Redirect::to(&format!("{frontend_url}{separator}{key}={value}"))
}

/// GET /api/auth/callback - Finish the OAuth flow
async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let frontend = state.config.frontend_url.as_str();

    if let Some(error) = params.error {
        tracing::warn!(%error, "OAuth provider returned an error");
        return to_frontend(frontend, "error", "oauth_error");
    }
    let Some(code) = params.code else {
        return to_frontend(frontend, "error", "missing_code");
    };

    let expected = session.take_oauth_state();
    if expected.is_none() || expected != params.state {
        tracing::warn!("OAuth state mismatch");
        return to_frontend(frontend, "error", "invalid_state");
    }

    match complete_login(&state, &code).await {
        Ok(user) => {
            tracing::info!(user = %user.email, "User logged in");
            session.login(user.id);
            to_frontend(frontend, "auth", "success")
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "OAuth callback failed");
            to_frontend(frontend, "error", "auth_failed")
        }
    }
}

async fn complete_login(state: &AppState, code: &str) -> anyhow::Result<User> {
    let oauth = state
        .oauth
        .as_ref()
        .context("Google OAuth2 not configured")?;

    let grant = oauth
        .exchange_code(code)
        .await
        .context("Failed to exchange authorization code")?;
    let info = oauth
        .user_info(&grant.access_token)
        .await
        .context("Failed to fetch user info")?;

    let user = info.into_user(grant);
    state.store.save_user(&user)?;
    Ok(user)
}

#[derive(Serialize)]
struct AuthStatus {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<UserProfile>,
}

/// GET /api/auth/status - Whether this browser is logged in, and as whom
async fn status(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<AuthStatus>, AppError> {
    let signed_out = AuthStatus {
        authenticated: false,
        user: None,
    };

    let Some(user_id) = session.user_id() else {
        return Ok(Json(signed_out));
    };

    match state.store.get_user(&user_id)? {
        Some(user) => Ok(Json(AuthStatus {
            authenticated: true,
            user: Some(user.profile()),
        })),
        None => {
            // The user was removed (logout elsewhere, or another account)
            session.logout();
            Ok(Json(signed_out))
        }
    }
}

/// POST /api/auth/logout - Forget the user, their cached data and the session
async fn logout(State(state): State<AppState>, session: Session) -> Result<Json<Value>, AppError> {
    let removed = state.store.delete_user()?;
    let events = state.store.clear_events()?;
    session.destroy();

    tracing::info!(users = removed, events, "User logged out");
    Ok(Json(json!({ "success": true })))
}
