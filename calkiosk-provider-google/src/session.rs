//! Creates a valid Google session (access token) for the stored kiosk user

use calkiosk_core::{Store, User};
use chrono::Utc;
use std::future::Future;

use crate::error::GoogleError;
use crate::oauth::GoogleOAuth;

pub struct GoogleSession {
    oauth: GoogleOAuth,
    store: Store,
    user: User,
}

impl GoogleSession {
    /// Load the stored user and refresh their token if it has expired.
    pub async fn load_valid(store: &Store, oauth: &GoogleOAuth) -> Result<Self, GoogleError> {
        let user = store.current_user()?.ok_or(GoogleError::NoUser)?;
        let mut session = GoogleSession {
            oauth: oauth.clone(),
            store: store.clone(),
            user,
        };

        if session.user.is_token_expired(Utc::now()) {
            tracing::info!(user = %session.user.email, "Access token expired, refreshing");
            session.refresh().await?;
        }

        Ok(session)
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn access_token(&self) -> &str {
        &self.user.access_token
    }

    /// Exchange the refresh token for a new access token and persist it.
    pub async fn refresh(&mut self) -> Result<(), GoogleError> {
        let refresh_token = self
            .user
            .usable_refresh_token()
            .ok_or(GoogleError::NoRefreshToken)?
            .to_string();

        let grant = self.oauth.refresh(&refresh_token).await?;

        self.store.update_tokens(
            &self.user.id,
            &grant.access_token,
            grant.refresh_token.as_deref(),
            grant.expires_at,
        )?;

        self.user.access_token = grant.access_token;
        if let Some(rotated) = grant.refresh_token {
            self.user.refresh_token = Some(rotated);
        }
        self.user.expires_at = grant.expires_at;
        self.user.updated_at = Utc::now();

        tracing::info!(user = %self.user.email, expires_at = %self.user.expires_at, "Refreshed access token");
        Ok(())
    }

    /// Run `call` with the current access token. If Google rejects the token,
    /// refresh it and run `call` once more.
    pub async fn call<T, F, Fut>(&mut self, call: F) -> Result<T, GoogleError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, GoogleError>>,
    {
        match call(self.user.access_token.clone()).await {
            Err(e) if e.should_refresh_token() => {
                tracing::warn!(user = %self.user.email, "Access token rejected, refreshing and retrying");
                self.refresh().await?;
                call(self.user.access_token.clone()).await
            }
            result => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::{GoogleEndpoints, OAuthCredentials};
    use crate::api::CalendarApi;
    use chrono::Duration;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user(expires_in_secs: i64, refresh_token: Option<&str>) -> User {
        let now = Utc::now();
        User {
            id: "u1".to_string(),
            email: "kiosk@example.com".to_string(),
            name: "Kiosk".to_string(),
            picture: None,
            access_token: "old-token".to_string(),
            refresh_token: refresh_token.map(String::from),
            expires_at: now + Duration::seconds(expires_in_secs),
            created_at: now,
            updated_at: now,
        }
    }

    async fn setup(user: Option<User>) -> (Store, GoogleOAuth, MockServer) {
        let server = MockServer::start().await;
        let oauth = GoogleOAuth::with_endpoints(
            OAuthCredentials {
                client_id: "id".into(),
                client_secret: "secret".into(),
                redirect_uri: "http://localhost/callback".into(),
            },
            GoogleEndpoints::with_base_url(&server.uri()),
        );
        let store = Store::open_in_memory().unwrap();
        if let Some(user) = user {
            store.save_user(&user).unwrap();
        }
        (store, oauth, server)
    }

    async fn mount_refresh(server: &MockServer, access_token: &str) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": access_token,
                "expires_in": 3600
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_no_user() {
        let (store, oauth, _server) = setup(None).await;
        let err = GoogleSession::load_valid(&store, &oauth).await.err().unwrap();
        assert!(matches!(err, GoogleError::NoUser));
        assert_eq!(err.to_string(), "No authenticated user found");
    }

    #[tokio::test]
    async fn test_valid_token_is_not_refreshed() {
        let (store, oauth, server) = setup(Some(user(3600, Some("rt")))).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let session = GoogleSession::load_valid(&store, &oauth).await.unwrap();
        assert_eq!(session.access_token(), "old-token");
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_saved() {
        let (store, oauth, server) = setup(Some(user(-60, Some("rt")))).await;
        mount_refresh(&server, "new-token").await;

        let session = GoogleSession::load_valid(&store, &oauth).await.unwrap();
        assert_eq!(session.access_token(), "new-token");

        let saved = store.current_user().unwrap().unwrap();
        assert_eq!(saved.access_token, "new-token");
        assert_eq!(saved.refresh_token.as_deref(), Some("rt"));
        assert!(!saved.is_token_expired(Utc::now()));
    }

    #[tokio::test]
    async fn test_expired_without_refresh_token() {
        let (store, oauth, _server) = setup(Some(user(-60, None))).await;
        let err = GoogleSession::load_valid(&store, &oauth).await.err().unwrap();
        assert_eq!(err.to_string(), "No refresh token available");
    }

    #[tokio::test]
    async fn test_rejected_token_is_refreshed_once() {
        let (store, oauth, server) = setup(Some(user(3600, Some("rt")))).await;
        let api = CalendarApi::with_base_url(&format!("{}/calendar/v3", server.uri()));
        mount_refresh(&server, "new-token").await;

        Mock::given(method("GET"))
            .and(path("/calendar/v3/users/me/calendarList"))
            .and(header("authorization", "Bearer old-token"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/calendar/v3/users/me/calendarList"))
            .and(header("authorization", "Bearer new-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{ "id": "me@example.com", "primary": true }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = GoogleSession::load_valid(&store, &oauth).await.unwrap();
        let api = &api;
        let calendars = session
            .call(|token| async move { api.fetch_calendars(&token, "u1").await })
            .await
            .unwrap();
        assert_eq!(calendars.len(), 1);
        assert_eq!(store.current_user().unwrap().unwrap().access_token, "new-token");
    }

    #[tokio::test]
    async fn test_second_rejection_is_returned() {
        let (store, oauth, server) = setup(Some(user(3600, Some("rt")))).await;
        let api = CalendarApi::with_base_url(&format!("{}/calendar/v3", server.uri()));
        mount_refresh(&server, "new-token").await;

        Mock::given(method("GET"))
            .and(path("/calendar/v3/users/me/calendarList"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;

        let mut session = GoogleSession::load_valid(&store, &oauth).await.unwrap();
        let api = &api;
        let err = session
            .call(|token| async move { api.fetch_calendars(&token, "u1").await })
            .await
            .unwrap_err();
        assert!(matches!(err, GoogleError::TokenExpired));
    }
}
