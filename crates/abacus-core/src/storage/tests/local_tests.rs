use std::fs;
use std::sync::Arc;

use serde_json::Map;
use tempfile::tempdir;

use crate::kernel::constants::GENERIC_TEMPLATE_ID;
use crate::storage::audit::MemoryAuditSink;
use crate::storage::config::{ConfigManager, ConfigUpdate, Environment};
use crate::storage::error::StorageSystemError;
use crate::storage::local::LocalStorageProvider;
use crate::storage::provider::StorageProvider;

#[test]
fn test_new_creates_base_directory() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("nested").join("store");
    let provider = LocalStorageProvider::new(base.clone()).unwrap();
    assert!(base.is_dir());
    assert_eq!(provider.base_path(), base.as_path());
    assert_eq!(provider.name(), "local");
}

#[test]
fn test_set_get_delete() {
    let dir = tempdir().unwrap();
    let provider = LocalStorageProvider::new(dir.path().to_path_buf()).unwrap();

    assert_eq!(provider.get("plugin-config:bmi").unwrap(), None);
    provider.set("plugin-config:bmi", "{\"a\":1}").unwrap();
    assert_eq!(provider.get("plugin-config:bmi").unwrap().as_deref(), Some("{\"a\":1}"));

    provider.set("plugin-config:bmi", "{\"a\":2}").unwrap();
    assert_eq!(provider.get("plugin-config:bmi").unwrap().as_deref(), Some("{\"a\":2}"));

    assert!(provider.delete("plugin-config:bmi").unwrap());
    assert!(!provider.delete("plugin-config:bmi").unwrap());
    assert_eq!(provider.get("plugin-config:bmi").unwrap(), None);
}

#[test]
fn test_keys_are_encoded_into_portable_file_names() {
    let dir = tempdir().unwrap();
    let provider = LocalStorageProvider::new(dir.path().to_path_buf()).unwrap();
    provider.set("plugin-config:a/b", "1").unwrap();

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["plugin-config%3Aa%2Fb.json".to_string()]);
    assert_eq!(provider.keys("plugin-config:").unwrap(), vec!["plugin-config:a/b".to_string()]);
}

#[test]
fn test_keys_filter_by_prefix_and_ignore_foreign_files() {
    let dir = tempdir().unwrap();
    let provider = LocalStorageProvider::new(dir.path().to_path_buf()).unwrap();
    provider.set("plugin-config:b", "1").unwrap();
    provider.set("plugin-config:a", "1").unwrap();
    provider.set("config-history", "[]").unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    assert_eq!(
        provider.keys("plugin-config:").unwrap(),
        vec!["plugin-config:a".to_string(), "plugin-config:b".to_string()]
    );
    assert_eq!(provider.keys("").unwrap().len(), 3);
}

#[test]
fn test_empty_key_is_rejected() {
    let dir = tempdir().unwrap();
    let provider = LocalStorageProvider::new(dir.path().to_path_buf()).unwrap();
    let err = provider.set("", "x").unwrap_err();
    assert!(matches!(err, StorageSystemError::InvalidKey { .. }));
}

#[test]
fn test_configs_survive_a_restart() {
    let dir = tempdir().unwrap();
    {
        let provider = Arc::new(LocalStorageProvider::new(dir.path().to_path_buf()).unwrap());
        let manager = ConfigManager::new(provider, Arc::new(MemoryAuditSink::new()));
        manager
            .create_config("bmi", GENERIC_TEMPLATE_ID, Environment::Production, Map::new())
            .unwrap();
        manager
            .update_config("bmi", ConfigUpdate::new().enabled(false), "alice")
            .unwrap();
    }

    let provider = Arc::new(LocalStorageProvider::new(dir.path().to_path_buf()).unwrap());
    let manager = ConfigManager::new(provider, Arc::new(MemoryAuditSink::new()));
    assert_eq!(manager.load_persisted().unwrap(), 1);
    let config = manager.get_config("bmi").unwrap();
    assert!(!config.enabled);
    assert_eq!(config.environment, Environment::Production);
    assert_eq!(manager.history(None).len(), 1);
}
