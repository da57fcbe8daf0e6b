use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Mutex;

use crate::storage::error::StorageSystemError;

/// Key/value backing store for persisted plugin configs.
///
/// Values are serialized documents addressed by keys such as
/// `plugin-config:<plugin id>`; the provider never interprets them.
pub trait StorageProvider: Send + Sync + Debug {
    /// Get the name of this storage provider
    fn name(&self) -> &str;

    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>, StorageSystemError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), StorageSystemError>;

    /// Remove `key`; returns whether it existed
    fn delete(&self, key: &str) -> Result<bool, StorageSystemError>;

    /// All stored keys that start with `prefix`, sorted
    fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageSystemError>;
}

/// Process-local provider; contents are lost on exit
#[derive(Debug, Default)]
pub struct MemoryStorageProvider {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorageProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, StorageSystemError> {
        self.entries
            .lock()
            .map_err(|_| StorageSystemError::InternalError("memory provider lock poisoned".into()))
    }
}

impl StorageProvider for MemoryStorageProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageSystemError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageSystemError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StorageSystemError> {
        Ok(self.entries()?.remove(key).is_some())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageSystemError> {
        Ok(self
            .entries()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
