//! Text renderers for the two mutually exclusive screens.
//!
//! Both are pure projections of controller state; they hold no state of their own.

use std::fmt;

use crate::controller::AuthController;
use crate::id_token::UserInfo;
use crate::notify::Notifier;
use crate::oauth::TokenEndpoint;
use crate::provider::AuthorizationProvider;
use crate::storage::SecretStore;

/// Unauthenticated prompt. The sign-in action is disabled until an
/// authorization request is ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInScreen {
    pub ready: bool,
}

/// Authenticated profile view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileScreen {
    pub user_info: UserInfo,
    pub id_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    SignIn(SignInScreen),
    Profile(ProfileScreen),
}

impl Screen {
    /// Profile when user info is present, sign-in prompt otherwise.
    #[must_use]
    pub fn project<P, T, S, N>(controller: &AuthController<P, T, S, N>) -> Self
    where
        P: AuthorizationProvider,
        T: TokenEndpoint,
        S: SecretStore,
        N: Notifier,
    {
        match controller.user_info() {
            Some(user_info) => Self::Profile(ProfileScreen {
                user_info: user_info.clone(),
                id_token: controller.session().and_then(|s| s.id_token.clone()),
            }),
            None => Self::SignIn(SignInScreen {
                ready: controller.request().is_some(),
            }),
        }
    }
}

impl fmt::Display for SignInScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Welcome")?;
        writeln!(f, "Sign in to continue")?;
        writeln!(f)?;
        if self.ready {
            writeln!(f, "  [ Sign in with Google ]")
        } else {
            writeln!(f, "  [ Sign in with Google ] (preparing...)")
        }
    }
}

impl fmt::Display for ProfileScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Welcome, {}!", self.user_info.name)?;
        if let Some(picture) = self.user_info.picture.as_deref().filter(|p| !p.is_empty()) {
            writeln!(f, "Picture: {picture}")?;
        }
        writeln!(f, "Email: {}", self.user_info.email)?;
        writeln!(f, "ID Token:")?;
        writeln!(f, "{}", self.id_token.as_deref().unwrap_or("-"))?;
        writeln!(f)?;
        writeln!(f, "  [ Refresh Token ]  [ Sign Out ]")
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignIn(screen) => fmt::Display::fmt(screen, f),
            Self::Profile(screen) => fmt::Display::fmt(screen, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(picture: Option<&str>) -> ProfileScreen {
        ProfileScreen {
            user_info: UserInfo {
                name: "A".into(),
                email: "a@x.com".into(),
                picture: picture.map(Into::into),
            },
            id_token: Some("h.p.s".into()),
        }
    }

    #[test]
    fn sign_in_marks_action_disabled_until_ready() {
        let pending = SignInScreen { ready: false }.to_string();
        let ready = SignInScreen { ready: true }.to_string();

        assert!(pending.contains("(preparing...)"));
        assert!(!ready.contains("(preparing...)"));
        assert!(ready.contains("Sign in with Google"));
    }

    #[test]
    fn profile_shows_user_and_token() {
        let text = profile(Some("http://x/p.png")).to_string();

        assert!(text.starts_with("Welcome, A!"));
        assert!(text.contains("Picture: http://x/p.png"));
        assert!(text.contains("Email: a@x.com"));
        assert!(text.contains("h.p.s"));
        assert!(text.contains("Refresh Token"));
        assert!(text.contains("Sign Out"));
    }

    #[test]
    fn profile_omits_missing_picture() {
        assert!(!profile(None).to_string().contains("Picture:"));
    }
}
