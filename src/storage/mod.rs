//! Key-value persistence for the game's two records.
//!
//! Both stores talk to a [`KeyValueStore`]: a string-keyed map of JSON
//! documents with an optional byte quota, the same contract a browser's local
//! storage offers.
//!
//! - [`FileStore`]: One `<key>.json` file per record in a data directory
//! - [`MemoryStore`]: In-process map, used by tests and as a scratch store
//! - [`SettingsStore`]: Settings record with avatar recompression and quota fallback
//! - [`LeaderboardStore`]: Ranked score history capped at 100 entries

pub mod leaderboard;
pub mod settings;

pub use leaderboard::{LEADERBOARD_KEY, LeaderboardStore, ScoreRecorder};
pub use settings::{SETTINGS_KEY, SaveOutcome, SettingsStore};

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::fs;
use std::sync::RwLock;
use thiserror::Error;

/// Errors raised by a [`KeyValueStore`]
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: u64, quota: u64 },

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// String-keyed document store.
///
/// Implementations must be usable behind a shared reference; writes are
/// last-write-wins.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

fn check_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

fn check_quota(quota: Option<u64>, others: u64, incoming: u64) -> Result<(), StorageError> {
    match quota {
        Some(quota) if others + incoming > quota => Err(StorageError::QuotaExceeded {
            needed: others + incoming,
            quota,
        }),
        _ => Ok(()),
    }
}

/// Extension of the scratch file a record is written to before the rename.
const TMP_EXTENSION: &str = "json.tmp";

/// File-backed store: every key lives in `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: Utf8PathBuf,
    quota_bytes: Option<u64>,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    ///
    /// # Arguments
    /// * `dir` - Directory holding the record files
    /// * `quota_bytes` - Total byte budget across all records, `None` for unlimited
    pub fn new<P: AsRef<Utf8Path>>(dir: P, quota_bytes: Option<u64>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir, quota_bytes })
    }

    fn path_for(&self, key: &str) -> Result<Utf8PathBuf, StorageError> {
        check_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }

    /// Bytes used by every record except `key`.
    fn usage_excluding(&self, key: &str) -> Result<u64, StorageError> {
        let own = format!("{key}.json");
        let mut total = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.ends_with(".json") && name != own {
                total += entry.metadata()?.len();
            }
        }
        Ok(total)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if self.quota_bytes.is_some() {
            check_quota(self.quota_bytes, self.usage_excluding(key)?, value.len() as u64)?;
        }
        // Write beside the record and swap it in, so a crash never leaves a torn record
        let tmp_path = path.with_extension(TMP_EXTENSION);
        fs::write(&tmp_path, value)?;
        fs::rename(&tmp_path, &path)?;
        tracing::debug!("Wrote {} bytes to {}", value.len(), path);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if path.exists() {
            fs::remove_file(&path)?;
            tracing::debug!("Removed {}", path);
        }
        Ok(())
    }
}

/// In-memory store with the same quota semantics as [`FileStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    quota_bytes: Option<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        check_key(key)?;
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        check_key(key)?;
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        let others: u64 = entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| v.len() as u64)
            .sum();
        check_quota(self.quota_bytes, others, value.len() as u64)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        check_key(key)?;
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}
