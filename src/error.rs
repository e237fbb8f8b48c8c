#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Google's token endpoint (or the authorization redirect) reported a failure.
    #[error("OAuth2 {operation} failed{}: {detail}", status_suffix(.status))]
    OAuth {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Identity token error: {0}")]
    IdToken(String),
    #[error("Token storage error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
    /// `sign_in` was called before an authorization request was prepared.
    #[error("Authorization request is not ready")]
    RequestNotReady,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl Error {
    pub(crate) fn oauth(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::OAuth {
            operation,
            status: None,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oauth_error_includes_status_when_known() {
        let err = Error::OAuth {
            operation: "token refresh",
            status: Some(400),
            detail: "invalid_grant".into(),
        };
        assert_eq!(
            err.to_string(),
            "OAuth2 token refresh failed (400): invalid_grant"
        );
    }

    #[test]
    fn oauth_error_without_status() {
        let err = Error::oauth("authorization", "access_denied");
        assert_eq!(err.to_string(), "OAuth2 authorization failed: access_denied");
    }
}
