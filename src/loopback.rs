//! Interactive authorization through a loopback redirect listener.
//!
//! The authorization URL is handed to a launcher (browser, terminal prompt),
//! and a one-shot HTTP listener on the redirect URI's address waits for Google
//! to redirect back with `code`/`state` or `error`.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use url::{Host, Url};

use crate::error::Error;
use crate::oauth::AuthorizationRequest;
use crate::provider::{AuthorizationOutcome, AuthorizationProvider};

/// How long to wait for the redirect before treating the prompt as dismissed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const SUCCESS_PAGE: &str = "<!doctype html><title>Signed in</title>\
<p>Sign-in complete. You can close this window.</p>";
const FAILURE_PAGE: &str = "<!doctype html><title>Sign-in failed</title>\
<p>Sign-in did not complete. You can close this window.</p>";

type Launcher = Box<dyn Fn(&str) -> std::io::Result<()> + Send + Sync>;

/// [`AuthorizationProvider`] that catches the redirect on a local socket.
pub struct LoopbackProvider {
    redirect_uri: Url,
    timeout: Duration,
    launcher: Launcher,
}

impl LoopbackProvider {
    /// `launcher` receives the authorization URL and must show it to the user.
    #[must_use]
    pub fn new(
        redirect_uri: Url,
        launcher: impl Fn(&str) -> std::io::Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            redirect_uri,
            timeout: DEFAULT_TIMEOUT,
            launcher: Box::new(launcher),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, request: &AuthorizationRequest) -> Result<AuthorizationOutcome, Error> {
        let host = match self.redirect_uri.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => {
                return Err(Error::Config(format!(
                    "redirect URI has no host: {}",
                    self.redirect_uri
                )));
            }
        };
        let port = self.redirect_uri.port_or_known_default().unwrap_or(80);
        let listener = TcpListener::bind((host.as_str(), port)).await?;

        let (tx, rx) = oneshot::channel();
        let state = CallbackState {
            tx: Arc::new(Mutex::new(Some(tx))),
        };
        let router = Router::new()
            .route(self.redirect_uri.path(), get(callback))
            .with_state(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tracing::debug!(redirect_uri = %self.redirect_uri, "Waiting for authorization redirect");
        (self.launcher)(&request.url)?;

        let outcome = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => AuthorizationOutcome::Dismissed,
            Err(_) => {
                tracing::info!(timeout_secs = self.timeout.as_secs(), "Authorization prompt timed out");
                AuthorizationOutcome::Dismissed
            }
        };

        let _ = shutdown_tx.send(());
        if tokio::time::timeout(Duration::from_secs(2), server)
            .await
            .is_err()
        {
            tracing::debug!("Loopback listener did not shut down in time");
        }

        Ok(outcome)
    }
}

impl AuthorizationProvider for LoopbackProvider {
    async fn authorize(&self, request: &AuthorizationRequest) -> AuthorizationOutcome {
        match self.run(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "Loopback authorization failed");
                AuthorizationOutcome::Error {
                    message: e.to_string(),
                }
            }
        }
    }
}

#[derive(Clone)]
struct CallbackState {
    tx: Arc<Mutex<Option<oneshot::Sender<AuthorizationOutcome>>>>,
}

#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn callback(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> Html<&'static str> {
    let outcome = outcome_from_params(params);
    let page = match outcome {
        AuthorizationOutcome::Redirect { .. } => SUCCESS_PAGE,
        _ => FAILURE_PAGE,
    };

    let sender = state
        .tx
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    match sender {
        Some(tx) => {
            let _ = tx.send(outcome);
        }
        None => tracing::debug!("Ignoring repeated authorization redirect"),
    }

    Html(page)
}

fn outcome_from_params(params: CallbackParams) -> AuthorizationOutcome {
    if let Some(error) = params.error {
        tracing::warn!(error = %error, description = ?params.error_description, "OAuth2 error from Google");
        let message = match params.error_description {
            Some(desc) if !desc.is_empty() => format!("{desc} ({error})"),
            _ => error,
        };
        return AuthorizationOutcome::Error { message };
    }

    match (params.code, params.state) {
        (Some(code), Some(state)) => AuthorizationOutcome::Redirect { code, state },
        (None, _) => AuthorizationOutcome::Error {
            message: "missing authorization code".into(),
        },
        (Some(_), None) => AuthorizationOutcome::Error {
            message: "missing state".into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientCredentials, OAuthConfig};
    use crate::platform::Platform;

    fn request_for(redirect: &Url) -> AuthorizationRequest {
        let config = OAuthConfig::new(redirect.clone());
        let profile = ClientCredentials {
            ios_client_id: Some("ios-id".to_string().into()),
            ..ClientCredentials::default()
        }
        .resolve(Platform::Ios)
        .unwrap();
        AuthorizationRequest::build(&config, &profile)
    }

    #[test]
    fn provider_error_becomes_error_outcome() {
        let outcome = outcome_from_params(CallbackParams {
            error: Some("access_denied".into()),
            error_description: Some("denied".into()),
            ..CallbackParams::default()
        });
        assert_eq!(
            outcome,
            AuthorizationOutcome::Error {
                message: "denied (access_denied)".into()
            }
        );
    }

    #[test]
    fn code_and_state_become_redirect() {
        let outcome = outcome_from_params(CallbackParams {
            code: Some("c".into()),
            state: Some("s".into()),
            ..CallbackParams::default()
        });
        assert_eq!(
            outcome,
            AuthorizationOutcome::Redirect {
                code: "c".into(),
                state: "s".into()
            }
        );
    }

    #[test]
    fn missing_code_is_an_error() {
        let outcome = outcome_from_params(CallbackParams {
            state: Some("s".into()),
            ..CallbackParams::default()
        });
        assert!(matches!(outcome, AuthorizationOutcome::Error { ref message } if message.contains("code")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn catches_redirect_on_loopback() {
        let redirect: Url = "http://127.0.0.1:47613/oauth2redirect".parse().unwrap();
        let request = request_for(&redirect);
        let callback_url = format!("{redirect}?code=abc&state={}", request.state);

        let provider = LoopbackProvider::new(redirect, move |_auth_url| {
            let url = callback_url.clone();
            tokio::spawn(async move {
                let _ = reqwest::get(url).await;
            });
            Ok(())
        })
        .with_timeout(Duration::from_secs(10));

        let outcome = provider.authorize(&request).await;

        assert_eq!(
            outcome,
            AuthorizationOutcome::Redirect {
                code: "abc".into(),
                state: request.state.clone(),
            }
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn times_out_as_dismissed() {
        let redirect: Url = "http://127.0.0.1:47614/oauth2redirect".parse().unwrap();
        let request = request_for(&redirect);
        let provider =
            LoopbackProvider::new(redirect, |_| Ok(())).with_timeout(Duration::from_millis(50));

        assert_eq!(
            provider.authorize(&request).await,
            AuthorizationOutcome::Dismissed
        );
    }
}
