use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::storage::error::StorageSystemError;
use crate::storage::provider::StorageProvider;

const FILE_EXTENSION: &str = "json";

/// Local filesystem storage provider: one file per key under a base directory
#[derive(Clone)]
pub struct LocalStorageProvider {
    base_path: PathBuf,
}

impl LocalStorageProvider {
    /// Create a provider rooted at `base_path`, creating the directory if needed
    pub fn new(base_path: PathBuf) -> Result<Self, StorageSystemError> {
        fs::create_dir_all(&base_path)
            .map_err(|e| StorageSystemError::io(e, "create_dir_all", base_path.clone()))?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a key to the file that stores it
    fn resolve_path(&self, key: &str) -> Result<PathBuf, StorageSystemError> {
        if key.is_empty() {
            return Err(StorageSystemError::InvalidKey {
                key: key.to_string(),
                reason: "key must not be empty".to_string(),
            });
        }
        Ok(self
            .base_path
            .join(format!("{}.{}", encode_key(key), FILE_EXTENSION)))
    }
}

impl fmt::Debug for LocalStorageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStorageProvider")
            .field("base_path", &self.base_path)
            .finish()
    }
}

/// Escape every byte outside `[A-Za-z0-9._-]` as `%XX` so keys like
/// `plugin-config:bmi` map to portable file names.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-' => out.push(byte as char),
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

fn decode_key(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = name.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

impl StorageProvider for LocalStorageProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageSystemError> {
        let full_path = self.resolve_path(key)?;
        match fs::read_to_string(&full_path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageSystemError::io(e, "read_to_string", full_path)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageSystemError> {
        let full_path = self.resolve_path(key)?;

        // Write to a temp file in the same directory, then atomically replace the target
        let mut temp_file = NamedTempFile::new_in(&self.base_path)
            .map_err(|e| StorageSystemError::io(e, "create_temp_file", self.base_path.clone()))?;
        temp_file
            .write_all(value.as_bytes())
            .map_err(|e| StorageSystemError::io(e, "write_to_temp_file", temp_file.path().to_path_buf()))?;
        temp_file
            .persist(&full_path)
            .map_err(|e| StorageSystemError::io(e.error, "persist_temp_file", full_path.clone()))?;

        log::debug!("Persisted '{}' to {}", key, full_path.display());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StorageSystemError> {
        let full_path = self.resolve_path(key)?;
        match fs::remove_file(&full_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageSystemError::io(e, "remove_file", full_path)),
        }
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageSystemError> {
        let entries = fs::read_dir(&self.base_path)
            .map_err(|e| StorageSystemError::io(e, "read_dir", self.base_path.clone()))?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageSystemError::io(e, "read_dir_entry", self.base_path.clone()))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            let Some(key) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(decode_key)
            else {
                continue;
            };
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}
