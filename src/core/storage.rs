//! Durable key/value storage for library snapshots.
//!
//! Two keys exist, one per collection. Writes are whole-document replaces
//! and are refused up front when they would push the stored total past
//! the quota.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use fs2::FileExt;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

use crate::config::paths::{lock_file_in, CATEGORIES_FILE, ITEMS_FILE};

/// Errors from the storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage quota exceeded: {required} bytes needed, quota is {quota}")]
    QuotaExceeded { required: u64, quota: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StorageError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded { .. })
    }
}

/// The independently stored collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Categories,
    Items,
}

impl StorageKey {
    pub const ALL: [StorageKey; 2] = [StorageKey::Categories, StorageKey::Items];

    /// File name used by [`FileStorage`]
    pub fn file_name(self) -> &'static str {
        match self {
            StorageKey::Categories => CATEGORIES_FILE,
            StorageKey::Items => ITEMS_FILE,
        }
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageKey::Categories => write!(f, "categories"),
            StorageKey::Items => write!(f, "items"),
        }
    }
}

/// Backend that persists serialized collections
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Read a stored document, `None` if nothing was saved yet
    async fn load(&self, key: StorageKey) -> Result<Option<String>, StorageError>;

    /// Replace a stored document
    async fn save(&self, key: StorageKey, value: &str) -> Result<(), StorageError>;
}

/// Total size after replacing `key` with `new_len` bytes
fn projected_size(sizes: impl IntoIterator<Item = (StorageKey, u64)>, key: StorageKey, new_len: u64) -> u64 {
    sizes
        .into_iter()
        .filter(|(k, _)| *k != key)
        .map(|(_, len)| len)
        .sum::<u64>()
        + new_len
}

/// JSON files in a state directory
pub struct FileStorage {
    home: PathBuf,
    quota_bytes: u64,
}

impl FileStorage {
    pub fn new(home: impl Into<PathBuf>, quota_bytes: u64) -> Self {
        Self {
            home: home.into(),
            quota_bytes,
        }
    }

    /// Storage at the configured home with the configured quota
    pub fn from_config() -> anyhow::Result<Self> {
        let cfg = crate::config::config()?;
        Ok(Self::new(cfg.home.clone(), cfg.quota_bytes))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn path_for(&self, key: StorageKey) -> PathBuf {
        self.home.join(key.file_name())
    }
}

#[async_trait]
impl StateStorage for FileStorage {
    async fn load(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, key: StorageKey, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.home).await?;

        let home = self.home.clone();
        let quota = self.quota_bytes;
        let data = value.as_bytes().to_vec();

        tokio::task::spawn_blocking(move || write_locked(&home, key, &data, quota)).await??;

        debug!(key = %key, bytes = value.len(), "Saved snapshot");
        Ok(())
    }
}

/// Check the quota and atomically replace `key`'s file, both under the
/// directory lock
fn write_locked(home: &Path, key: StorageKey, data: &[u8], quota: u64) -> Result<(), StorageError> {
    let lock = OpenOptions::new()
        .create(true)
        .write(true)
        .open(lock_file_in(home))?;

    // Released when `lock` is dropped
    lock.lock_exclusive()?;

    let mut sizes = Vec::new();
    for k in StorageKey::ALL {
        sizes.push((k, stored_len(&home.join(k.file_name()))?));
    }

    let required = projected_size(sizes, key, data.len() as u64);
    if required > quota {
        return Err(StorageError::QuotaExceeded { required, quota });
    }

    let mut tmp = NamedTempFile::new_in(home)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(home.join(key.file_name())).map_err(|e| e.error)?;

    Ok(())
}

fn stored_len(path: &Path) -> Result<u64, StorageError> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// In-process storage with an optional quota
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<StorageKey, String>>,
    quota_bytes: Option<u64>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Pre-populate a key, bypassing the quota
    pub fn with_entry(self, key: StorageKey, value: impl Into<String>) -> Self {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, value.into());
        }
        self
    }

    /// Current stored document for `key`
    pub fn get(&self, key: StorageKey) -> Option<String> {
        self.entries.lock().ok()?.get(&key).cloned()
    }
}

#[async_trait]
impl StateStorage for MemoryStorage {
    async fn load(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
        Ok(self.get(key))
    }

    async fn save(&self, key: StorageKey, value: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| std::io::Error::new(ErrorKind::Other, "storage lock poisoned"))?;

        if let Some(quota) = self.quota_bytes {
            let sizes = entries.iter().map(|(k, v)| (*k, v.len() as u64));
            let required = projected_size(sizes, key, value.len() as u64);
            if required > quota {
                return Err(StorageError::QuotaExceeded { required, quota });
            }
        }

        entries.insert(key, value.to_string());
        Ok(())
    }
}
