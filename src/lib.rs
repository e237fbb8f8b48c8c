#![doc = include_str!("../README.md")]

pub mod config;
pub mod controller;
pub mod error;
pub mod id_token;
#[cfg(feature = "loopback")]
pub mod loopback;
pub mod notify;
pub mod oauth;
pub mod pkce;
pub mod platform;
pub mod provider;
pub mod screens;
pub mod session;
pub mod storage;

// Re-exports for convenient access
pub use config::{
    ClientCredentials, ClientId, ClientSecret, OAuthConfig, PlatformProfile, RefreshRequest,
};
pub use controller::{AuthController, AuthState, RefreshOutcome};
pub use error::Error;
pub use id_token::{IdTokenClaims, UserInfo, decode_claims, decode_user_info};
#[cfg(feature = "loopback")]
pub use loopback::LoopbackProvider;
pub use notify::{Notifier, TerminalNotifier};
pub use oauth::{AuthClient, AuthorizationRequest, TokenEndpoint};
pub use pkce::{Pkce, generate_state};
pub use platform::Platform;
pub use provider::{AuthResponse, AuthorizationOutcome, AuthorizationProvider};
pub use screens::{ProfileScreen, Screen, SignInScreen};
pub use session::{AuthSession, TokenResponse};
#[cfg(feature = "keyring")]
pub use storage::KeyringStore;
pub use storage::{
    FileStore, MemoryStore, PlatformStore, REFRESH_TOKEN_KEY, RefreshTokenStore, SecretStore,
};
