//! Refresh-token persistence.
//!
//! One logical slot, addressed by [`REFRESH_TOKEN_KEY`], in a backend chosen
//! by platform: local persistent storage on web, the OS secret store on
//! native platforms. Every operation is idempotent.

mod file;
#[cfg(feature = "keyring")]
mod secure;
mod memory;

use std::future::Future;
use std::path::PathBuf;

pub use file::FileStore;
#[cfg(feature = "keyring")]
pub use secure::KeyringStore;
pub use memory::MemoryStore;

use crate::error::Error;
use crate::platform::Platform;

/// Fixed key of the persisted refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Async string key-value store.
///
/// `delete` of an absent key and `save` of an identical value are no-ops.
pub trait SecretStore: Send + Sync {
    fn save(&self, key: &str, value: &str) -> impl Future<Output = Result<(), Error>> + Send;

    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, Error>> + Send;

    fn delete(&self, key: &str) -> impl Future<Output = Result<(), Error>> + Send;
}

/// The refresh-token slot on top of a [`SecretStore`].
#[derive(Debug, Clone)]
pub struct RefreshTokenStore<S> {
    inner: S,
}

impl<S: SecretStore> RefreshTokenStore<S> {
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// # Errors
    ///
    /// Returns `Error::Storage` if the backend write fails.
    pub async fn save(&self, token: &str) -> Result<(), Error> {
        self.inner.save(REFRESH_TOKEN_KEY, token).await
    }

    /// # Errors
    ///
    /// Returns `Error::Storage` if the backend read fails.
    pub async fn get(&self) -> Result<Option<String>, Error> {
        Ok(self
            .inner
            .get(REFRESH_TOKEN_KEY)
            .await?
            .filter(|t| !t.is_empty()))
    }

    /// # Errors
    ///
    /// Returns `Error::Storage` if the backend delete fails.
    pub async fn delete(&self) -> Result<(), Error> {
        self.inner.delete(REFRESH_TOKEN_KEY).await
    }

    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

/// Backend selected from the platform.
#[derive(Debug, Clone)]
pub enum PlatformStore {
    Local(FileStore),
    #[cfg(feature = "keyring")]
    Secure(KeyringStore),
}

impl PlatformStore {
    /// Web → [`FileStore`] under `local_dir`; native → [`KeyringStore`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for a native platform when the `keyring`
    /// feature is disabled.
    pub fn for_platform(platform: Platform, local_dir: impl Into<PathBuf>) -> Result<Self, Error> {
        match platform {
            Platform::Web => Ok(Self::Local(FileStore::new(local_dir))),
            #[cfg(feature = "keyring")]
            Platform::Ios | Platform::Android => Ok(Self::Secure(KeyringStore::new())),
            #[cfg(not(feature = "keyring"))]
            Platform::Ios | Platform::Android => Err(Error::Config(format!(
                "platform {platform} needs the OS secret store (enable the `keyring` feature)"
            ))),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            #[cfg(feature = "keyring")]
            Self::Secure(_) => "keyring",
        }
    }
}

impl SecretStore for PlatformStore {
    async fn save(&self, key: &str, value: &str) -> Result<(), Error> {
        match self {
            Self::Local(store) => store.save(key, value).await,
            #[cfg(feature = "keyring")]
            Self::Secure(store) => store.save(key, value).await,
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        match self {
            Self::Local(store) => store.get(key).await,
            #[cfg(feature = "keyring")]
            Self::Secure(store) => store.get(key).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        match self {
            Self::Local(store) => store.delete(key).await,
            #[cfg(feature = "keyring")]
            Self::Secure(store) => store.delete(key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refresh_slot_uses_fixed_key() {
        let memory = MemoryStore::new();
        let store = RefreshTokenStore::new(memory.clone());

        store.save("r1").await.unwrap();

        assert_eq!(memory.snapshot(REFRESH_TOKEN_KEY).as_deref(), Some("r1"));
        assert_eq!(store.get().await.unwrap().as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = RefreshTokenStore::new(MemoryStore::new());
        store.save("r1").await.unwrap();

        store.delete().await.unwrap();
        store.delete().await.unwrap();

        assert_eq!(store.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_value_reads_as_absent() {
        let store = RefreshTokenStore::new(MemoryStore::new());
        store.save("").await.unwrap();
        assert_eq!(store.get().await.unwrap(), None);
    }

    #[test]
    fn web_selects_local_store() {
        let store = PlatformStore::for_platform(Platform::Web, "/tmp/unused").unwrap();
        assert_eq!(store.name(), "local");
    }

    #[cfg(feature = "keyring")]
    #[test]
    fn native_selects_secure_store() {
        for platform in [Platform::Ios, Platform::Android] {
            let store = PlatformStore::for_platform(platform, "/tmp/unused").unwrap();
            assert_eq!(store.name(), "keyring");
        }
    }
}
