use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Client platform the sign-in flow runs on.
///
/// Google treats these as distinct OAuth clients: `Web` is a confidential
/// client (holds a secret, may request offline access), `Ios` and `Android`
/// are public clients and must never embed a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Web,
    Ios,
    Android,
}

impl Platform {
    /// Platform of the current compile target.
    ///
    /// Targets other than iOS and Android resolve to `Web`: a host process that
    /// can keep a secret behaves as the confidential client.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(target_os = "ios") {
            Self::Ios
        } else if cfg!(target_os = "android") {
            Self::Android
        } else {
            Self::Web
        }
    }

    #[must_use]
    pub const fn is_web(self) -> bool {
        matches!(self, Self::Web)
    }

    /// Native platforms are public OAuth clients.
    #[must_use]
    pub const fn is_native(self) -> bool {
        !self.is_web()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Ios => "ios",
            Self::Android => "android",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "web" => Ok(Self::Web),
            "ios" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            other => Err(Error::Config(format!(
                "unknown platform '{other}' (expected web, ios or android)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Web".parse::<Platform>().unwrap(), Platform::Web);
        assert_eq!(" ios ".parse::<Platform>().unwrap(), Platform::Ios);
        assert_eq!("ANDROID".parse::<Platform>().unwrap(), Platform::Android);
    }

    #[test]
    fn rejects_unknown_platform() {
        let err = "windows".parse::<Platform>().unwrap_err();
        assert!(err.to_string().contains("windows"));
    }

    #[test]
    fn only_web_is_confidential() {
        assert!(Platform::Web.is_web());
        assert!(Platform::Ios.is_native());
        assert!(Platform::Android.is_native());
    }

    #[test]
    fn display_matches_parse() {
        for p in [Platform::Web, Platform::Ios, Platform::Android] {
            assert_eq!(p.to_string().parse::<Platform>().unwrap(), p);
        }
    }
}
