use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::SecretStore;
use crate::error::Error;

/// In-memory store. Clones share the same map, so a test can keep a handle
/// and inspect what the controller persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated with one entry.
    #[must_use]
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::new();
        store
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
        store
    }

    /// Current value for `key`, read synchronously.
    #[must_use]
    pub fn snapshot(&self, key: &str) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl SecretStore for MemoryStore {
    async fn save(&self, key: &str, value: &str) -> Result<(), Error> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.snapshot(key))
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}
