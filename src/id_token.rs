//! Identity token payload decoding.
//!
//! The payload is read without verifying the signature: the token arrives
//! directly from Google's token endpoint over TLS, which is the trust boundary
//! for this client.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::Error;

/// `aud` claim: a single client id or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    #[must_use]
    pub fn contains(&self, client_id: &str) -> bool {
        match self {
            Self::One(aud) => aud == client_id,
            Self::Many(auds) => auds.iter().any(|a| a == client_id),
        }
    }
}

/// Claims carried by a Google identity token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct IdTokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Option<Audience>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub picture: Option<String>,
    /// Claims not modelled above (`given_name`, `locale`, `hd`, ...).
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Profile shown for the signed-in user; always derived from an identity token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    pub email: String,
    pub picture: Option<String>,
}

impl From<&IdTokenClaims> for UserInfo {
    fn from(claims: &IdTokenClaims) -> Self {
        Self {
            name: claims.name.clone().unwrap_or_default(),
            email: claims.email.clone().unwrap_or_default(),
            picture: claims.picture.clone(),
        }
    }
}

/// Decodes the payload of a compact JWT (`header.payload.signature`).
///
/// # Errors
///
/// Returns `Error::IdToken` if the token does not have three segments, or the
/// payload is not base64url-encoded JSON.
pub fn decode_claims(token: &str) -> Result<IdTokenClaims, Error> {
    let payload = extract_payload(token)?;
    serde_json::from_slice(&payload).map_err(|e| Error::IdToken(format!("invalid payload: {e}")))
}

/// Decodes the identity token straight into a [`UserInfo`].
///
/// # Errors
///
/// See [`decode_claims`].
pub fn decode_user_info(token: &str) -> Result<UserInfo, Error> {
    decode_claims(token).map(|claims| UserInfo::from(&claims))
}

fn extract_payload(token: &str) -> Result<Vec<u8>, Error> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    if parts.len() != 3 {
        return Err(Error::IdToken(format!(
            "invalid token format: expected 3 segments, got {}",
            parts.len()
        )));
    }

    let payload_b64 = parts[1].trim_end_matches('=');
    if payload_b64.is_empty() {
        return Err(Error::IdToken("empty payload".into()));
    }

    URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|e| Error::IdToken(format!("invalid payload encoding: {e}")))
}
