use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::instrument;

use super::SecretStore;
use crate::error::Error;

/// File name of the key-value document inside the storage directory.
const STORAGE_FILE: &str = "local_storage.json";

/// Local persistent key-value storage: one JSON object in
/// `{dir}/local_storage.json`, replaced atomically and owner-only on Unix.
///
/// Unencrypted, like browser local storage; used on the web platform only.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(STORAGE_FILE)
    }

    /// Raw document contents; `None` when the file is missing or blank.
    fn read(&self) -> Result<Option<String>, Error> {
        let path = self.path();
        match fs::read_to_string(&path) {
            Ok(c) if c.trim().is_empty() => Ok(None),
            Ok(c) => Ok(Some(c)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    fn parse(&self, contents: &str) -> Result<BTreeMap<String, String>, Error> {
        serde_json::from_str(contents)
            .map_err(|e| Error::Storage(format!("failed to parse {}: {e}", self.path().display())))
    }

    fn load(&self) -> Result<BTreeMap<String, String>, Error> {
        match self.read()? {
            Some(contents) => self.parse(&contents),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Replace the document atomically: write a 0600 temp file, sync it, then
    /// rename it over the old one.
    fn store(&self, entries: &BTreeMap<String, String>) -> Result<(), Error> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            Error::Storage(format!(
                "failed to create directory {}: {e}",
                self.dir.display()
            ))
        })?;

        let path = self.path();
        let temp_path = path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(entries)
            .map_err(|e| Error::Storage(format!("failed to serialize storage: {e}")))?;

        // A leftover temp file would keep its old permissions.
        match fs::remove_file(&temp_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::Storage(format!(
                    "failed to remove stale {}: {e}",
                    temp_path.display()
                )));
            }
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&temp_path).map_err(|e| {
            Error::Storage(format!("failed to create {}: {e}", temp_path.display()))
        })?;
        file.write_all(contents.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|e| {
                let _ = fs::remove_file(&temp_path);
                Error::Storage(format!("failed to write {}: {e}", temp_path.display()))
            })?;

        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(Error::Storage(format!(
                "failed to rename {} to {}: {e}",
                temp_path.display(),
                path.display()
            )));
        }
        Ok(())
    }

    fn remove(&self) -> Result<(), Error> {
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!(
                "failed to remove {}: {e}",
                path.display()
            ))),
        }
    }
}

impl SecretStore for FileStore {
    #[instrument(skip(self, value))]
    async fn save(&self, key: &str, value: &str) -> Result<(), Error> {
        let mut entries = self.load()?;
        if entries.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        entries.insert(key.to_string(), value.to_string());
        self.store(&entries)
    }

    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.load()?.remove(key))
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<(), Error> {
        let Some(contents) = self.read()? else {
            return Ok(());
        };
        // Unparsable: drop the whole document so the key cannot survive.
        let mut entries = match self.parse(&contents) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable storage file");
                return self.remove();
            }
        };
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.store(&entries)
    }
}
