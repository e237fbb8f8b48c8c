//! Sign-in state machine.
//!
//! ```text
//! SignedOut ──sign_in──▶ Requesting ──redirect──▶ Exchanging ──tokens──▶ SignedIn
//!     ▲                      │ error/dismissed          │ failure            │ │
//!     └──────────────────────┴──────────────────────────┘                    │ │
//!     └───────────────────────── sign_out / refresh failure ─────────────────┘ │
//!                                                   refresh success ◀──────────┘
//! ```
//!
//! Every mutating operation takes `&mut self`, so a refresh can never overlap
//! a sign-out or a second sign-in.

use crate::config::{OAuthConfig, PlatformProfile};
use crate::error::Error;
use crate::id_token::{self, UserInfo};
use crate::notify::Notifier;
use crate::oauth::{AuthorizationRequest, TokenEndpoint};
use crate::provider::{AuthResponse, AuthorizationOutcome, AuthorizationProvider};
use crate::session::AuthSession;
use crate::storage::{RefreshTokenStore, SecretStore};

const UNKNOWN_ERROR: &str = "An unknown error occurred";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    /// Authorization request handed to the provider, waiting for the user.
    Requesting,
    /// Redirect received, code-for-token exchange in flight.
    Exchanging,
    SignedIn,
}

/// Result of [`AuthController::refresh_access_token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed,
    /// Nothing persisted; state untouched.
    NoRefreshToken,
    /// The refresh failed and the session was discarded.
    SignedOut,
}

/// Google sign-in controller.
///
/// Owns the in-memory session and the derived [`UserInfo`], and the persisted
/// refresh token slot. `UserInfo` is only ever set from the current session's
/// identity token.
pub struct AuthController<P, T, S, N> {
    config: OAuthConfig,
    profile: PlatformProfile,
    provider: P,
    tokens: T,
    store: RefreshTokenStore<S>,
    notifier: N,
    state: AuthState,
    request: Option<AuthorizationRequest>,
    session: Option<AuthSession>,
    user_info: Option<UserInfo>,
}

impl<P, T, S, N> AuthController<P, T, S, N>
where
    P: AuthorizationProvider,
    T: TokenEndpoint,
    S: SecretStore,
    N: Notifier,
{
    #[must_use]
    pub fn new(
        config: OAuthConfig,
        profile: PlatformProfile,
        provider: P,
        tokens: T,
        store: S,
        notifier: N,
    ) -> Self {
        Self {
            config,
            profile,
            provider,
            tokens,
            store: RefreshTokenStore::new(store),
            notifier,
            state: AuthState::SignedOut,
            request: None,
            session: None,
            user_info: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state
    }

    #[must_use]
    pub fn session(&self) -> Option<&AuthSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn user_info(&self) -> Option<&UserInfo> {
        self.user_info.as_ref()
    }

    /// The prepared authorization request, if any. Sign-in is unavailable
    /// until one exists.
    #[must_use]
    pub fn request(&self) -> Option<&AuthorizationRequest> {
        self.request.as_ref()
    }

    #[must_use]
    pub fn profile(&self) -> &PlatformProfile {
        &self.profile
    }

    #[must_use]
    pub fn store(&self) -> &RefreshTokenStore<S> {
        &self.store
    }

    /// Build a fresh authorization request, replacing any unused one.
    pub fn prepare_request(&mut self) -> &AuthorizationRequest {
        self.request
            .insert(AuthorizationRequest::build(&self.config, &self.profile))
    }

    /// Run the interactive flow and handle its single callback.
    ///
    /// A new request is prepared afterwards regardless of the outcome, since
    /// PKCE verifiers and state values are single-use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RequestNotReady`] before [`prepare_request`](Self::prepare_request),
    /// otherwise whatever [`handle_response`](Self::handle_response) reports.
    pub async fn sign_in(&mut self) -> Result<(), Error> {
        let request = self.request.take().ok_or(Error::RequestNotReady)?;
        self.state = AuthState::Requesting;
        tracing::info!(platform = %self.profile.platform(), "Starting Google sign-in");

        let response = match self.provider.authorize(&request).await {
            AuthorizationOutcome::Redirect { state, .. } if state != request.state => {
                tracing::warn!("OAuth state mismatch");
                AuthResponse::error("state mismatch")
            }
            AuthorizationOutcome::Redirect { code, .. } => {
                self.state = AuthState::Exchanging;
                match self
                    .tokens
                    .exchange_code(&code, &request.code_verifier, &self.profile)
                    .await
                {
                    Ok(session) => AuthResponse::Success(session),
                    Err(e) => {
                        tracing::error!(error = %e, "Token exchange failed");
                        AuthResponse::error(e.to_string())
                    }
                }
            }
            AuthorizationOutcome::Error { message } => AuthResponse::Error {
                message: Some(message),
            },
            AuthorizationOutcome::Dismissed => AuthResponse::Dismissed,
        };

        self.prepare_request();
        self.handle_response(response).await
    }

    /// Apply the outcome of an authorization attempt.
    ///
    /// On success the identity token is decoded into [`UserInfo`] and a
    /// refresh token, if issued, is persisted. A missing or malformed identity
    /// token rejects the transition: nothing is stored and the user is
    /// notified.
    ///
    /// # Errors
    ///
    /// Returns `Error::OAuth` for an error response and `Error::IdToken` for
    /// an undecodable identity token. The user has already been notified.
    pub async fn handle_response(&mut self, response: AuthResponse) -> Result<(), Error> {
        match response {
            AuthResponse::Success(session) => {
                let user_info = match decode_session(&session) {
                    Ok(info) => info,
                    Err(e) => {
                        tracing::warn!(error = %e, "Rejecting sign-in with unusable identity token");
                        self.state = self.settled_state();
                        self.notifier.alert("Authentication Error", &e.to_string());
                        return Err(e);
                    }
                };

                let refresh_token = session.refresh_token.clone();
                self.session = Some(session);
                self.user_info = Some(user_info);
                self.state = AuthState::SignedIn;
                tracing::info!("Google sign-in successful");

                if let Some(token) = refresh_token {
                    self.persist_refresh_token(&token).await;
                }
                Ok(())
            }
            AuthResponse::Error { message } => {
                let message = message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
                tracing::error!(error = %message, "Authentication responded with error");
                self.state = self.settled_state();
                self.notifier.alert("Authentication Error", &message);
                Err(Error::oauth("authorization", message))
            }
            AuthResponse::Dismissed => {
                tracing::debug!("Authorization prompt dismissed");
                self.state = self.settled_state();
                Ok(())
            }
        }
    }

    /// Clear the in-memory session and delete the persisted refresh token.
    ///
    /// The in-memory state is cleared even if the delete fails.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` if the persisted token could not be deleted.
    pub async fn sign_out(&mut self) -> Result<(), Error> {
        self.session = None;
        self.user_info = None;
        self.state = AuthState::SignedOut;
        if self.request.is_none() {
            self.prepare_request();
        }

        if let Err(e) = self.store.delete().await {
            tracing::warn!(error = %e, "Failed to delete persisted refresh token");
            self.notifier.alert(
                "Sign-out Error",
                "The stored refresh token could not be deleted.",
            );
            return Err(e);
        }
        tracing::info!("Signed out");
        Ok(())
    }

    /// Exchange the persisted refresh token for a new session.
    ///
    /// Without a persisted token the user is told so and nothing changes. Any
    /// failure of the exchange itself, or a malformed identity token in its
    /// result, is treated as unrecoverable: the user is notified and signed
    /// out. A result with no identity token at all still yields a session;
    /// the profile stays absent until the next sign-in.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` if the persisted token cannot be read, or if
    /// the forced sign-out cannot delete it.
    pub async fn refresh_access_token(&mut self) -> Result<RefreshOutcome, Error> {
        let stored = match self.store.get().await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted refresh token");
                self.notifier.alert("Refresh Error", &e.to_string());
                return Err(e);
            }
        };
        let Some(refresh_token) = stored else {
            tracing::info!("No persisted refresh token");
            self.notifier.alert(
                "No Refresh Token available.",
                "Sign in again to obtain one. Native clients may not be issued a refresh token.",
            );
            return Ok(RefreshOutcome::NoRefreshToken);
        };

        let request = self.profile.refresh_request(refresh_token.clone());
        let refreshed = match self.tokens.refresh(&request).await {
            Ok(session) => {
                let issued = session.refresh_token.clone();
                let session = session.merge_refresh(self.session.as_ref(), &refresh_token);
                match session.id_token.as_deref() {
                    Some(token) => id_token::decode_user_info(token)
                        .map(|info| (session, Some(info), issued)),
                    None => Ok((session, None, issued)),
                }
            }
            Err(e) => Err(e),
        };

        match refreshed {
            Ok((session, user_info, issued)) => {
                if user_info.is_none() {
                    tracing::info!("Refresh response carried no identity token; profile unavailable");
                }
                self.session = Some(session);
                self.user_info = user_info;
                self.state = AuthState::SignedIn;
                if let Some(token) = issued {
                    self.persist_refresh_token(&token).await;
                }
                tracing::info!("Access token refreshed");
                self.notifier.alert("Token Refreshed!", "");
                Ok(RefreshOutcome::Refreshed)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to refresh token");
                self.notifier.alert(
                    "Refresh Error",
                    "Failed to refresh token. Please sign out and sign in again.",
                );
                self.sign_out().await?;
                Ok(RefreshOutcome::SignedOut)
            }
        }
    }

    async fn persist_refresh_token(&self, token: &str) {
        if let Err(e) = self.store.save(token).await {
            tracing::warn!(error = %e, "Failed to persist refresh token");
            self.notifier.alert(
                "Storage Error",
                "The refresh token could not be saved; you will need to sign in again next time.",
            );
        }
    }

    fn settled_state(&self) -> AuthState {
        if self.session.is_some() {
            AuthState::SignedIn
        } else {
            AuthState::SignedOut
        }
    }
}

fn decode_session(session: &AuthSession) -> Result<UserInfo, Error> {
    let token = session
        .id_token
        .as_deref()
        .ok_or_else(|| Error::IdToken("response carried no identity token".into()))?;
    id_token::decode_user_info(token)
}
