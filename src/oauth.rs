use std::future::Future;

use serde::Deserialize;
use time::OffsetDateTime;

use crate::config::{OAuthConfig, PlatformProfile, RefreshRequest};
use crate::error::Error;
use crate::pkce::{self, Pkce};
use crate::session::{AuthSession, TokenResponse};

/// Authorization URL plus the PKCE/state values the redirect must match.
///
/// Single-use: build a new one for every attempt.
#[derive(Clone)]
#[non_exhaustive]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub code_verifier: String,
}

impl AuthorizationRequest {
    /// Build the Google authorization URL for `profile`.
    #[must_use]
    pub fn build(config: &OAuthConfig, profile: &PlatformProfile) -> Self {
        let state = pkce::generate_state();
        let pkce = Pkce::generate();
        let scope = config.scopes.join(" ");

        let mut url = config.auth_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", profile.client_id.as_str())
                .append_pair("redirect_uri", config.redirect_uri.as_str())
                .append_pair("scope", &scope)
                .append_pair("state", &state)
                .append_pair("code_challenge", pkce.challenge())
                .append_pair("code_challenge_method", Pkce::method());
            for (key, value) in &profile.extra_params {
                query.append_pair(key, value);
            }
        }

        Self {
            url: url.into(),
            state,
            code_verifier: pkce.into_verifier(),
        }
    }
}

impl std::fmt::Debug for AuthorizationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationRequest")
            .field("url", &self.url)
            .field("state", &self.state)
            .field("code_verifier", &"<redacted>")
            .finish()
    }
}

/// Code-for-token and refresh-token exchanges.
///
/// [`AuthClient`] is the HTTP implementation; tests substitute their own.
pub trait TokenEndpoint: Send + Sync {
    /// Exchange an authorization code (with its PKCE verifier) for a session.
    fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        profile: &PlatformProfile,
    ) -> impl Future<Output = Result<AuthSession, Error>> + Send;

    /// Obtain a fresh session from a refresh token.
    fn refresh(
        &self,
        request: &RefreshRequest,
    ) -> impl Future<Output = Result<AuthSession, Error>> + Send;
}

/// Google token endpoint client.
pub struct AuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl AuthClient {
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    async fn post_token(
        &self,
        params: &[(&str, &str)],
        operation: &'static str,
    ) -> Result<AuthSession, Error> {
        let response = self
            .http
            .post(self.config.token_url.clone())
            .form(params)
            .send()
            .await?;

        let response = Self::ensure_success(response, operation).await?;
        let tokens = response.json::<TokenResponse>().await?;
        Ok(AuthSession::from_response(tokens, OffsetDateTime::now_utc()))
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(ErrorBody {
                error,
                error_description: Some(desc),
            }) => format!("{error}: {desc}"),
            Ok(ErrorBody { error, .. }) => error,
            Err(_) => body,
        };
        Err(Error::OAuth {
            operation,
            status: Some(status),
            detail,
        })
    }
}

impl TokenEndpoint for AuthClient {
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        profile: &PlatformProfile,
    ) -> Result<AuthSession, Error> {
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", profile.client_id.as_str()),
            ("code_verifier", code_verifier),
        ];
        if let Some(secret) = &profile.client_secret {
            params.push(("client_secret", secret.expose()));
        }

        self.post_token(&params, "token exchange").await
    }

    async fn refresh(&self, request: &RefreshRequest) -> Result<AuthSession, Error> {
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", request.refresh_token.as_str()),
            ("client_id", request.client_id.as_str()),
        ];
        if let Some(secret) = &request.client_secret {
            params.push(("client_secret", secret.expose()));
        }

        self.post_token(&params, "token refresh").await
    }
}
