// Shared harness for HTTP-level tests: the full router over an in-memory
// store, with every Google endpoint served by a wiremock server.

#![allow(dead_code)]

use std::collections::HashMap;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use calkiosk_core::Store;
use calkiosk_provider_google::GoogleEndpoints;
use calkiosk_server::config::Config;
use calkiosk_server::state::AppState;

pub struct Harness {
    pub app: Router,
    pub store: Store,
    pub google: MockServer,
}

pub async fn harness() -> Harness {
    build(true).await
}

pub async fn harness_without_oauth() -> Harness {
    build(false).await
}

async fn build(with_oauth: bool) -> Harness {
    let google = MockServer::start().await;

    let mut vars: HashMap<&str, &str> = HashMap::from([("SESSION_SECRET", "test-secret")]);
    if with_oauth {
        vars.insert("GOOGLE_CLIENT_ID", "client-id");
        vars.insert("GOOGLE_CLIENT_SECRET", "client-secret");
        vars.insert("GOOGLE_REDIRECT_URI", "http://kiosk.test/api/auth/callback");
    }
    let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

    let store = Store::open_in_memory().unwrap();
    let state = AppState::with_endpoints(
        config,
        store.clone(),
        GoogleEndpoints::with_base_url(&google.uri()),
    );

    Harness {
        app: calkiosk_server::app(state).unwrap(),
        store,
        google,
    }
}

impl Harness {
    pub async fn send(&self, method: Method, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.app
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(Method::GET, uri, cookie).await
    }

    pub async fn post(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(Method::POST, uri, cookie).await
    }

    /// Answer the code exchange and userinfo calls the callback makes.
    pub async fn mount_google_login(&self) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .mount(&self.google)
            .await;

        Mock::given(method("GET"))
            .and(path("/oauth2/v2/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "user-1",
                "email": "kiosk@example.com",
                "name": "Kitchen Kiosk",
                "picture": "https://example.com/kiosk.png"
            })))
            .mount(&self.google)
            .await;
    }

    /// Start the OAuth flow and return the session cookie and CSRF state.
    pub async fn start_login(&self) -> (String, String) {
        let response = self.get("/api/auth/login", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let cookie = session_cookie(&response).expect("login sets a session cookie");
        let state = url::Url::parse(location(&response))
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .expect("consent URL carries a state");
        (cookie, state)
    }

    /// Log in through the real login and callback endpoints.
    pub async fn login(&self) -> String {
        self.mount_google_login().await;
        let (cookie, state) = self.start_login().await;

        let response = self
            .get(
                &format!("/api/auth/callback?code=auth-code&state={state}"),
                Some(&cookie),
            )
            .await;
        assert_eq!(location(&response), "/?auth=success");
        session_cookie(&response).expect("login rotates the session cookie")
    }
}

/// The `name=value` part of the response's session cookie.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
