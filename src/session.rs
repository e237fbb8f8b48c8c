use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Token set returned by Google's token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".into()
}

/// In-memory authenticated session.
///
/// Lives only for the process lifetime; the refresh token is the only part
/// that is ever persisted, and that is done by the controller.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct AuthSession {
    pub access_token: String,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub scope: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

impl AuthSession {
    /// Minimal session with only an access token.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            id_token: None,
            refresh_token: None,
            token_type: default_token_type(),
            scope: None,
            expires_at: None,
        }
    }

    #[must_use]
    pub fn with_id_token(mut self, id_token: impl Into<String>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    #[must_use]
    pub fn with_expires_at(mut self, expires_at: OffsetDateTime) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Build a session from a token response received at `now`.
    #[must_use]
    pub fn from_response(response: TokenResponse, now: OffsetDateTime) -> Self {
        let expires_at = response
            .expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .map(|secs| now + Duration::seconds(secs));
        Self {
            access_token: response.access_token,
            id_token: response.id_token,
            refresh_token: response.refresh_token,
            token_type: response.token_type,
            scope: response.scope,
            expires_at,
        }
    }

    /// Carry over tokens a refresh response did not re-issue.
    ///
    /// Google only returns a new refresh token on rotation and may omit the
    /// identity token, so the previous values stay current in that case.
    #[must_use]
    pub fn merge_refresh(mut self, previous: Option<&AuthSession>, refresh_token: &str) -> Self {
        if self.id_token.is_none() {
            self.id_token = previous.and_then(|p| p.id_token.clone());
        }
        if self.refresh_token.is_none() {
            self.refresh_token = Some(refresh_token.to_string());
        }
        self
    }

    /// True once the access token's expiry has passed. Sessions without a
    /// known expiry never report expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }

    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"<redacted>")
            .field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn from_response_computes_absolute_expiry() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","expires_in":3599,"id_token":"i","scope":"openid email","token_type":"Bearer"}"#,
        )
        .unwrap();
        let now = datetime!(2026-01-01 12:00 UTC);

        let session = AuthSession::from_response(response, now);

        assert_eq!(session.access_token, "a");
        assert_eq!(session.id_token.as_deref(), Some("i"));
        assert_eq!(session.refresh_token, None);
        assert_eq!(session.expires_at, Some(datetime!(2026-01-01 12:59:59 UTC)));
        assert!(!session.is_expired_at(now));
        assert!(session.is_expired_at(datetime!(2026-01-01 13:00 UTC)));
    }

    #[test]
    fn token_type_defaults_to_bearer() {
        let response: TokenResponse = serde_json::from_str(r#"{"access_token":"a"}"#).unwrap();
        assert_eq!(response.token_type, "Bearer");
    }

    #[test]
    fn merge_refresh_keeps_previous_tokens_when_not_reissued() {
        let previous = AuthSession::new("old").with_id_token("old-id");
        let refreshed = AuthSession::new("new").merge_refresh(Some(&previous), "r1");

        assert_eq!(refreshed.access_token, "new");
        assert_eq!(refreshed.id_token.as_deref(), Some("old-id"));
        assert_eq!(refreshed.refresh_token.as_deref(), Some("r1"));
    }

    #[test]
    fn merge_refresh_prefers_reissued_tokens() {
        let previous = AuthSession::new("old").with_id_token("old-id");
        let refreshed = AuthSession::new("new")
            .with_id_token("new-id")
            .with_refresh_token("r2")
            .merge_refresh(Some(&previous), "r1");

        assert_eq!(refreshed.id_token.as_deref(), Some("new-id"));
        assert_eq!(refreshed.refresh_token.as_deref(), Some("r2"));
    }

    #[test]
    fn session_without_expiry_never_expires() {
        assert!(!AuthSession::new("a").is_expired());
    }

    #[test]
    fn debug_redacts_tokens() {
        let session = AuthSession::new("access-secret").with_refresh_token("refresh-secret");
        let debug = format!("{session:?}");
        assert!(!debug.contains("access-secret"));
        assert!(!debug.contains("refresh-secret"));
    }
}
