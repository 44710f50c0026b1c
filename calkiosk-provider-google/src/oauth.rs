//! Google OAuth2 authorization-code flow.

use calkiosk_core::User;
use chrono::{DateTime, Duration, Utc};
use url::Url;

use crate::app_config::{GoogleEndpoints, OAuthCredentials};
use crate::error::{GoogleError, check_response, check_token_response};
use crate::types::{TokenResponse, UserInfoResponse};

pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/calendar.readonly",
];

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Tokens granted by the token endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    /// Only present on the first consent (or when Google rotates it).
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl From<TokenResponse> for TokenGrant {
    fn from(tokens: TokenResponse) -> Self {
        let lifetime = tokens.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        TokenGrant {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token.filter(|t| !t.is_empty()),
            expires_at: Utc::now() + Duration::seconds(lifetime),
        }
    }
}

/// The signed-in account as reported by the userinfo endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleUserInfo {
    pub id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

impl From<UserInfoResponse> for GoogleUserInfo {
    fn from(info: UserInfoResponse) -> Self {
        GoogleUserInfo {
            name: info
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| info.email.clone()),
            id: info.id,
            email: info.email,
            picture: info.picture,
        }
    }
}

impl GoogleUserInfo {
    /// Combine identity and tokens into the user row the kiosk stores.
    pub fn into_user(self, grant: TokenGrant) -> User {
        let now = Utc::now();
        User {
            id: self.id,
            email: self.email,
            name: self.name,
            picture: self.picture,
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expires_at: grant.expires_at,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone)]
pub struct GoogleOAuth {
    client: reqwest::Client,
    credentials: OAuthCredentials,
    endpoints: GoogleEndpoints,
}

impl GoogleOAuth {
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self::with_endpoints(credentials, GoogleEndpoints::default())
    }

    pub fn with_endpoints(credentials: OAuthCredentials, endpoints: GoogleEndpoints) -> Self {
        GoogleOAuth {
            client: reqwest::Client::new(),
            credentials,
            endpoints,
        }
    }

    /// Consent page URL. `state` is echoed back to the callback and must be
    /// checked there.
    pub fn authorization_url(&self, state: &str) -> Result<String, GoogleError> {
        let scope = SCOPES.join(" ");
        let url = Url::parse_with_params(
            &self.endpoints.auth_url,
            &[
                ("client_id", self.credentials.client_id.as_str()),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("include_granted_scopes", "true"),
                ("state", state),
            ],
        )?;
        Ok(url.into())
    }

    /// Exchange an authorization code for tokens.
    #[tracing::instrument(skip(self, code), level = "info")]
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, GoogleError> {
        let response = self
            .client
            .post(&self.endpoints.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        let tokens: TokenResponse = check_token_response(response).await?.json().await?;
        Ok(tokens.into())
    }

    /// Get a fresh access token. Google usually omits the refresh token here.
    #[tracing::instrument(skip(self, refresh_token), level = "info")]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, GoogleError> {
        let response = self
            .client
            .post(&self.endpoints.token_url)
            .form(&[
                ("refresh_token", refresh_token),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let tokens: TokenResponse = check_token_response(response).await?.json().await?;
        Ok(tokens.into())
    }

    #[tracing::instrument(skip(self, access_token), level = "debug")]
    pub async fn user_info(&self, access_token: &str) -> Result<GoogleUserInfo, GoogleError> {
        let response = self
            .client
            .get(&self.endpoints.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let info: UserInfoResponse = check_response(response).await?.json().await?;
        Ok(info.into())
    }
}
