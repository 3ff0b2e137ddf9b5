//! Config Store
//!
//! Async key-value store cho config và logs. Core không tự persist -
//! engines chỉ gọi qua `ConfigStore`.
//!
//! Backends:
//! - `MemoryStore`: in-process map (tests, embedders)
//! - `FileStore`: one JSON file per key under the data directory

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

// ============================================================================
// KEYS
// ============================================================================

pub mod keys {
    pub const THREAT_CONFIG: &str = "threat_detection_config";
    pub const THREAT_LOG: &str = "threat_log";
    pub const USAGE_PATTERNS: &str = "usage_patterns";
    pub const EMERGENCY_CONFIG: &str = "emergency_config";
    pub const EMERGENCY_CONTACTS: &str = "emergency_contacts";
    pub const EMERGENCY_LOG: &str = "emergency_log";
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// STORE TRAIT
// ============================================================================

#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Read and decode a JSON blob. `Ok(None)` when the key is absent.
pub async fn load_json<T: DeserializeOwned>(
    store: &dyn ConfigStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Encode and write a JSON blob
pub async fn save_json<T: Serialize + ?Sized>(
    store: &dyn ConfigStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(value)?;
    store.set(key, bytes).await
}

/// Load with fallback. Missing or unreadable blobs degrade to `T::default()`.
pub async fn load_or_default<T: DeserializeOwned + Default>(
    store: &dyn ConfigStore,
    key: &str,
) -> T {
    match load_json::<T>(store, key).await {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(e) => {
            log::warn!("Failed to load '{}', using defaults: {}", key, e);
            T::default()
        }
    }
}

/// Save and log on failure. In-memory state is never rolled back.
pub async fn persist<T: Serialize + ?Sized>(store: &dyn ConfigStore, key: &str, value: &T) {
    match save_json(store, key, value).await {
        Ok(()) => log::debug!("Persisted '{}'", key),
        Err(e) => log::error!("Failed to persist '{}': {}", key, e),
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

// ============================================================================
// FILE STORE
// ============================================================================

/// One `<key>.json` file per key
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store under the default data directory
    pub fn default_location() -> Self {
        Self::new(crate::constants::get_data_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.root.join(format!("{}.json", file))
    }
}

#[async_trait]
impl ConfigStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.path_for(key), value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
