//! Cookie-backed server-side sessions.
//!
//! The browser holds `calkiosk.sid=<id>.<signature>`; the data lives in memory
//! keyed by id. A session is only stored, and the cookie only issued, once a
//! handler writes to it.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::routes::AppError;
use crate::state::AppState;

pub const COOKIE_NAME: &str = "calkiosk.sid";
pub const SESSION_MAX_AGE_HOURS: i64 = 24;

type HmacSha256 = Hmac<Sha256>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn signature(id: &str, secret: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(id.as_bytes());
    Some(mac)
}

/// `id.base64url(HMAC-SHA256(id))`
pub fn sign(id: &str, secret: &str) -> Option<String> {
    let mac = signature(id, secret)?;
    let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Some(format!("{id}.{sig}"))
}

/// The session id of a signed cookie value, if the signature checks out.
pub fn verify(value: &str, secret: &str) -> Option<String> {
    let (id, sig) = value.rsplit_once('.')?;
    let sig = URL_SAFE_NO_PAD.decode(sig).ok()?;
    signature(id, secret)?.verify_slice(&sig).ok()?;
    Some(id.to_string())
}

fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// What a session remembers between requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionData {
    pub user_id: Option<String>,
    pub oauth_state: Option<String>,
}

#[derive(Debug, Default)]
struct SessionState {
    id: Option<String>,
    data: SessionData,
    changed: bool,
    rotate: bool,
    destroyed: bool,
}

/// The current request's session. Extract it in a handler; changes are
/// written back when the response leaves [`session_layer`].
#[derive(Clone, Default)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
}

impl Session {
    fn existing(id: String, data: SessionData) -> Self {
        Session {
            state: Arc::new(Mutex::new(SessionState {
                id: Some(id),
                data,
                ..Default::default()
            })),
        }
    }

    pub fn user_id(&self) -> Option<String> {
        lock(&self.state).data.user_id.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        lock(&self.state).data.user_id.is_some()
    }

    pub fn set_oauth_state(&self, oauth_state: String) {
        let mut state = lock(&self.state);
        state.data.oauth_state = Some(oauth_state);
        state.changed = true;
    }

    /// Remove and return the pending OAuth state; it is single-use.
    pub fn take_oauth_state(&self) -> Option<String> {
        let mut state = lock(&self.state);
        let taken = state.data.oauth_state.take();
        if taken.is_some() {
            state.changed = true;
        }
        taken
    }

    /// Mark the session as belonging to `user_id`. The session id is rotated.
    pub fn login(&self, user_id: String) {
        let mut state = lock(&self.state);
        state.data.user_id = Some(user_id);
        state.data.oauth_state = None;
        state.changed = true;
        state.rotate = true;
    }

    /// Drop authentication but keep the session.
    pub fn logout(&self) {
        let mut state = lock(&self.state);
        if state.data.user_id.take().is_some() {
            state.changed = true;
        }
    }

    /// Forget the session entirely and expire the cookie.
    pub fn destroy(&self) {
        lock(&self.state).destroyed = true;
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::from(anyhow::anyhow!("Session layer is not installed")))
    }
}

#[derive(Debug, Clone)]
struct StoredSession {
    data: SessionData,
    expires_at: DateTime<Utc>,
}

/// In-memory session storage plus the cookie settings used to hand out ids.
#[derive(Clone)]
pub struct SessionStore {
    entries: Arc<Mutex<HashMap<String, StoredSession>>>,
    secret: Arc<str>,
    secure: bool,
    max_age: Duration,
}

impl SessionStore {
    pub fn new(secret: &str, secure: bool) -> Self {
        SessionStore {
            entries: Arc::new(Mutex::new(HashMap::new())),
            secret: Arc::from(secret),
            secure,
            max_age: Duration::hours(SESSION_MAX_AGE_HOURS),
        }
    }

    /// The session named by the request's cookie, or a fresh empty one.
    pub fn load(&self, headers: &HeaderMap) -> Session {
        let Some(id) = read_cookie(headers, COOKIE_NAME).and_then(|v| verify(&v, &self.secret))
        else {
            return Session::default();
        };

        let entries = lock(&self.entries);
        match entries.get(&id) {
            Some(stored) if stored.expires_at > Utc::now() => {
                Session::existing(id, stored.data.clone())
            }
            _ => Session::default(),
        }
    }

    /// Persist changes made to `session`. Returns the `Set-Cookie` value to
    /// send, if the browser needs a new cookie.
    pub fn commit(&self, session: &Session) -> Option<String> {
        let mut state = lock(&session.state);
        let mut entries = lock(&self.entries);

        if state.destroyed {
            if let Some(id) = state.id.take() {
                entries.remove(&id);
            }
            return Some(self.cookie("", 0));
        }
        if !state.changed {
            return None;
        }

        let now = Utc::now();
        entries.retain(|_, stored| stored.expires_at > now);

        let previous = state.id.clone();
        let id = match (&previous, state.rotate) {
            (Some(id), false) => id.clone(),
            (old, _) => {
                if let Some(old) = old {
                    entries.remove(old);
                }
                uuid::Uuid::new_v4().to_string()
            }
        };

        entries.insert(
            id.clone(),
            StoredSession {
                data: state.data.clone(),
                expires_at: now + self.max_age,
            },
        );
        state.id = Some(id.clone());
        state.changed = false;
        state.rotate = false;

        if previous.as_deref() == Some(id.as_str()) {
            return None;
        }
        let value = sign(&id, &self.secret)?;
        Some(self.cookie(&value, self.max_age.num_seconds()))
    }

    fn cookie(&self, value: &str, max_age: i64) -> String {
        let secure = if self.secure { "; Secure" } else { "" };
        format!("{COOKIE_NAME}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}{secure}")
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        lock(&self.entries).len()
    }
}

/// Attach a [`Session`] to every request and write it back afterwards.
pub async fn session_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = state.sessions.load(request.headers());
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;

    if let Some(cookie) = state.sessions.commit(&session) {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => tracing::error!(error = %e, "Could not encode session cookie"),
        }
    }
    response
}
