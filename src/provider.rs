use std::future::Future;

use crate::oauth::AuthorizationRequest;
use crate::session::AuthSession;

/// What came back from the interactive part of the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    /// The provider redirected back with an authorization code.
    Redirect { code: String, state: String },
    /// The provider reported an error (`access_denied`, ...).
    Error { message: String },
    /// The user closed the prompt or it timed out.
    Dismissed,
}

/// Interactive authorization: show the consent screen, wait for the redirect.
///
/// The provider completes exactly once per call; cancellation is not supported.
pub trait AuthorizationProvider: Send + Sync {
    fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> impl Future<Output = AuthorizationOutcome> + Send;
}

/// The single callback delivered to the controller after a sign-in attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResponse {
    Success(AuthSession),
    Error { message: Option<String> },
    Dismissed,
}

impl AuthResponse {
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: Some(message.into()),
        }
    }
}
