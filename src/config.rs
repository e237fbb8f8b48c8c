use derive_more::{Display, From, Into};
use url::Url;

use crate::error::Error;
use crate::platform::Platform;

/// Default loopback redirect used when `GOOGLE_REDIRECT_URI` is unset.
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8765/oauth2redirect";

/// Google `OAuth2` endpoint and redirect configuration.
///
/// The redirect URI is the only required field; endpoints and scopes default to
/// Google's OIDC values.
///
/// ```rust,ignore
/// use google_signin::OAuthConfig;
///
/// let config = OAuthConfig::new("http://127.0.0.1:8765/oauth2redirect".parse()?)
///     .with_scopes(vec!["openid".into(), "email".into()]);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) redirect_uri: Url,
    pub(crate) scopes: Vec<String>,
}

impl OAuthConfig {
    #[must_use]
    pub fn new(redirect_uri: Url) -> Self {
        Self {
            redirect_uri,
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth"
                .parse()
                .expect("valid default URL"),
            token_url: "https://oauth2.googleapis.com/token"
                .parse()
                .expect("valid default URL"),
            scopes: vec!["openid".into(), "profile".into(), "email".into()],
        }
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `GOOGLE_REDIRECT_URI`: redirect target (default [`DEFAULT_REDIRECT_URI`])
    /// - `GOOGLE_AUTH_URL`: override the authorization endpoint
    /// - `GOOGLE_TOKEN_URL`: override the token endpoint
    /// - `GOOGLE_SCOPES`: comma-separated scopes
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any URL is invalid.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(env_lookup)
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any URL is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let redirect_uri = match lookup("GOOGLE_REDIRECT_URI") {
            Some(raw) => parse_url("GOOGLE_REDIRECT_URI", &raw)?,
            None => parse_url("GOOGLE_REDIRECT_URI", DEFAULT_REDIRECT_URI)?,
        };
        let mut config = Self::new(redirect_uri);

        if let Some(raw) = lookup("GOOGLE_AUTH_URL") {
            config = config.with_auth_url(parse_url("GOOGLE_AUTH_URL", &raw)?);
        }
        if let Some(raw) = lookup("GOOGLE_TOKEN_URL") {
            config = config.with_token_url(parse_url("GOOGLE_TOKEN_URL", &raw)?);
        }
        if let Some(scopes) = lookup("GOOGLE_SCOPES") {
            config = config.with_scopes(
                scopes
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    #[must_use]
    pub fn with_redirect_uri(mut self, url: Url) -> Self {
        self.redirect_uri = url;
        self
    }

    /// Override the scopes (default: `["openid", "profile", "email"]`).
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

/// Google OAuth client identifier for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Display, From, Into)]
pub struct ClientId(pub String);

impl ClientId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Web client secret. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, From, Into)]
pub struct ClientSecret(pub String);

impl ClientSecret {
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ClientSecret(<redacted>)")
    }
}

/// Per-platform OAuth client identifiers, plus the web client secret.
///
/// Values are read-only process configuration; which of them is used is decided
/// by [`resolve`](Self::resolve).
#[derive(Debug, Clone, Default)]
pub struct ClientCredentials {
    pub web_client_id: Option<ClientId>,
    pub ios_client_id: Option<ClientId>,
    pub android_client_id: Option<ClientId>,
    pub client_secret: Option<ClientSecret>,
}

impl ClientCredentials {
    /// Read credentials from the environment.
    ///
    /// # Env vars (all optional here, checked by [`resolve`](Self::resolve))
    /// - `GOOGLE_WEB_CLIENT_ID`
    /// - `GOOGLE_IOS_CLIENT_ID`
    /// - `GOOGLE_ANDROID_CLIENT_ID`
    /// - `GOOGLE_CLIENT_SECRET`: web client only
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            web_client_id: lookup("GOOGLE_WEB_CLIENT_ID").map(ClientId),
            ios_client_id: lookup("GOOGLE_IOS_CLIENT_ID").map(ClientId),
            android_client_id: lookup("GOOGLE_ANDROID_CLIENT_ID").map(ClientId),
            client_secret: lookup("GOOGLE_CLIENT_SECRET").map(ClientSecret),
        }
    }

    /// Resolve the complete client descriptor for `platform`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the platform's client id is missing, or if
    /// `platform` is web and no client secret is configured.
    pub fn resolve(&self, platform: Platform) -> Result<PlatformProfile, Error> {
        let (client_id, var) = match platform {
            Platform::Web => (&self.web_client_id, "GOOGLE_WEB_CLIENT_ID"),
            Platform::Ios => (&self.ios_client_id, "GOOGLE_IOS_CLIENT_ID"),
            Platform::Android => (&self.android_client_id, "GOOGLE_ANDROID_CLIENT_ID"),
        };
        let client_id = client_id
            .clone()
            .ok_or_else(|| Error::Config(format!("{var} is required for platform {platform}")))?;

        if platform.is_native() {
            return Ok(PlatformProfile {
                platform,
                client_id,
                client_secret: None,
                extra_params: Vec::new(),
            });
        }

        let client_secret = self.client_secret.clone().ok_or_else(|| {
            Error::Config("GOOGLE_CLIENT_SECRET is required for platform web".into())
        })?;
        Ok(PlatformProfile {
            platform,
            client_id,
            client_secret: Some(client_secret),
            extra_params: vec![
                ("access_type".into(), "offline".into()),
                ("prompt".into(), "consent".into()),
            ],
        })
    }
}

/// Everything that differs between platforms, resolved once.
///
/// Web profiles carry a client secret and ask for offline access; native
/// profiles carry neither.
#[derive(Debug, Clone)]
pub struct PlatformProfile {
    pub(crate) platform: Platform,
    pub(crate) client_id: ClientId,
    pub(crate) client_secret: Option<ClientSecret>,
    pub(crate) extra_params: Vec<(String, String)>,
}

impl PlatformProfile {
    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    #[must_use]
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    #[must_use]
    pub fn client_secret(&self) -> Option<&ClientSecret> {
        self.client_secret.as_ref()
    }

    /// Extra authorization URL parameters (`access_type`, `prompt` on web).
    #[must_use]
    pub fn extra_params(&self) -> &[(String, String)] {
        &self.extra_params
    }

    /// Refresh descriptor for `refresh_token`; includes the secret only on web.
    #[must_use]
    pub fn refresh_request(&self, refresh_token: impl Into<String>) -> RefreshRequest {
        RefreshRequest {
            refresh_token: refresh_token.into(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
        }
    }
}

/// Input to a refresh-token exchange.
#[derive(Clone)]
pub struct RefreshRequest {
    pub refresh_token: String,
    pub client_id: ClientId,
    pub client_secret: Option<ClientSecret>,
}

impl std::fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshRequest")
            .field("refresh_token", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret)
            .finish()
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_url(var: &str, raw: &str) -> Result<Url, Error> {
    raw.parse()
        .map_err(|e| Error::Config(format!("{var}: {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn all_credentials() -> ClientCredentials {
        ClientCredentials::from_lookup(lookup(&[
            ("GOOGLE_WEB_CLIENT_ID", "web-id"),
            ("GOOGLE_IOS_CLIENT_ID", "ios-id"),
            ("GOOGLE_ANDROID_CLIENT_ID", "android-id"),
            ("GOOGLE_CLIENT_SECRET", "shh"),
        ]))
    }

    #[test]
    fn web_profile_carries_secret_and_offline_access() {
        let profile = all_credentials().resolve(Platform::Web).unwrap();

        assert_eq!(profile.client_id().as_str(), "web-id");
        assert_eq!(profile.client_secret().unwrap().expose(), "shh");
        assert!(
            profile
                .extra_params()
                .contains(&("access_type".into(), "offline".into()))
        );
        assert!(
            profile
                .extra_params()
                .contains(&("prompt".into(), "consent".into()))
        );
    }

    #[test]
    fn native_profiles_never_carry_secret() {
        let creds = all_credentials();
        for (platform, id) in [(Platform::Ios, "ios-id"), (Platform::Android, "android-id")] {
            let profile = creds.resolve(platform).unwrap();
            assert_eq!(profile.client_id().as_str(), id);
            assert!(profile.client_secret().is_none());
            assert!(profile.extra_params().is_empty());
            assert!(profile.refresh_request("r1").client_secret.is_none());
        }
    }

    #[test]
    fn web_refresh_request_includes_secret() {
        let profile = all_credentials().resolve(Platform::Web).unwrap();
        let req = profile.refresh_request("r1");
        assert_eq!(req.refresh_token, "r1");
        assert_eq!(req.client_id.as_str(), "web-id");
        assert_eq!(req.client_secret.unwrap().expose(), "shh");
    }

    #[test]
    fn missing_client_id_is_config_error() {
        let creds = ClientCredentials::from_lookup(lookup(&[("GOOGLE_WEB_CLIENT_ID", "web-id")]));
        let err = creds.resolve(Platform::Android).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("GOOGLE_ANDROID_CLIENT_ID")));
    }

    #[test]
    fn web_without_secret_is_config_error() {
        let creds = ClientCredentials::from_lookup(lookup(&[("GOOGLE_WEB_CLIENT_ID", "web-id")]));
        let err = creds.resolve(Platform::Web).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("GOOGLE_CLIENT_SECRET")));
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let profile = all_credentials().resolve(Platform::Web).unwrap();
        let debug = format!("{:?}", profile.refresh_request("refresh-value"));
        assert!(!debug.contains("shh"));
        assert!(!debug.contains("refresh-value"));
    }

    #[test]
    fn oauth_config_defaults_to_google() {
        let config = OAuthConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.redirect_uri().as_str(), DEFAULT_REDIRECT_URI);
        assert_eq!(
            config.auth_url().as_str(),
            "https://accounts.google.com/o/oauth2/v2/auth"
        );
        assert_eq!(config.token_url().as_str(), "https://oauth2.googleapis.com/token");
        assert_eq!(config.scopes(), &["openid", "profile", "email"]);
    }

    #[test]
    fn oauth_config_overrides_from_lookup() {
        let config = OAuthConfig::from_lookup(lookup(&[
            ("GOOGLE_REDIRECT_URI", "http://localhost:9000/cb"),
            ("GOOGLE_TOKEN_URL", "http://localhost:9001/token"),
            ("GOOGLE_SCOPES", "openid, email,"),
        ]))
        .unwrap();

        assert_eq!(config.redirect_uri().as_str(), "http://localhost:9000/cb");
        assert_eq!(config.token_url().as_str(), "http://localhost:9001/token");
        assert_eq!(config.scopes(), &["openid", "email"]);
    }

    #[test]
    fn invalid_url_names_the_variable() {
        let err = OAuthConfig::from_lookup(lookup(&[("GOOGLE_AUTH_URL", "not a url")])).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.starts_with("GOOGLE_AUTH_URL")));
    }
}
