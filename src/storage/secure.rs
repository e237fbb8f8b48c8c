use tracing::instrument;

use super::SecretStore;
use crate::error::Error;

/// OS secret store (Keychain, Credential Manager, kernel keyring).
///
/// Keyring calls block, so each one runs on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringStore {
    /// Service name under which entries are filed.
    pub const SERVICE_NAME: &str = "google-signin";

    #[must_use]
    pub fn new() -> Self {
        Self::with_service(Self::SERVICE_NAME)
    }

    #[must_use]
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    async fn with_entry<T, F>(&self, key: &str, op: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(keyring::Entry) -> Result<T, keyring::Error> + Send + 'static,
    {
        let service = self.service.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let entry = keyring::Entry::new(&service, &key)
                .map_err(|e| Error::Storage(format!("failed to open keyring entry: {e}")))?;
            op(entry).map_err(|e| Error::Storage(format!("keyring error: {e}")))
        })
        .await
        .map_err(|e| Error::Storage(format!("keyring task failed: {e}")))?
    }
}

impl SecretStore for KeyringStore {
    #[instrument(skip(self, value))]
    async fn save(&self, key: &str, value: &str) -> Result<(), Error> {
        let value = value.to_string();
        self.with_entry(key, move |entry| entry.set_password(&value))
            .await
    }

    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.with_entry(key, |entry| match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.with_entry(key, |entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        })
        .await
    }
}
