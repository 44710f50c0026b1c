//! The single kiosk user and their OAuth tokens.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// How long before the recorded expiry a token is already treated as expired.
pub const EXPIRY_SKEW_SECS: i64 = 60;

/// The authenticated account. Tokens never leave the server; use
/// [`User::profile`] for anything that is rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public identity returned by the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            picture: self.picture.clone(),
        }
    }

    pub fn is_token_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECS) >= self.expires_at
    }

    /// The refresh token, ignoring an empty string some grants carry.
    pub fn usable_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(expires_in: i64, refresh_token: Option<&str>) -> User {
        let now = Utc::now();
        User {
            id: "u1".into(),
            email: "kiosk@example.com".into(),
            name: "Kiosk".into(),
            picture: None,
            access_token: "at".into(),
            refresh_token: refresh_token.map(String::from),
            expires_at: now + Duration::seconds(expires_in),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_token_expiry_includes_skew() {
        let now = Utc::now();
        assert!(!user(3600, None).is_token_expired(now));
        assert!(user(30, None).is_token_expired(now));
        assert!(user(-10, None).is_token_expired(now));
    }

    #[test]
    fn test_empty_refresh_token_is_unusable() {
        assert_eq!(user(0, Some("")).usable_refresh_token(), None);
        assert_eq!(user(0, Some("rt")).usable_refresh_token(), Some("rt"));
        assert_eq!(user(0, None).usable_refresh_token(), None);
    }

    #[test]
    fn test_profile_omits_tokens() {
        let json = serde_json::to_value(user(3600, Some("rt")).profile()).unwrap();
        assert_eq!(json["email"], "kiosk@example.com");
        assert!(json.get("access_token").is_none());
    }
}
