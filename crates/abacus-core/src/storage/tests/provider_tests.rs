use serde_json::json;

use crate::storage::audit::{AuditEntry, AuditSeverity, AuditSink, MemoryAuditSink};
use crate::storage::config::{ConfigUpdate, Environment};
use crate::storage::error::StorageSystemError;
use crate::storage::format::ConfigFormat;
use crate::storage::provider::{MemoryStorageProvider, StorageProvider};

#[test]
fn test_memory_provider_round_trip() {
    let provider = MemoryStorageProvider::new();
    assert_eq!(provider.name(), "memory");
    provider.set("plugin-config:b", "2").unwrap();
    provider.set("plugin-config:a", "1").unwrap();
    provider.set("other", "x").unwrap();

    assert_eq!(provider.get("plugin-config:a").unwrap().as_deref(), Some("1"));
    assert_eq!(
        provider.keys("plugin-config:").unwrap(),
        vec!["plugin-config:a".to_string(), "plugin-config:b".to_string()]
    );
    assert!(provider.delete("other").unwrap());
    assert!(!provider.delete("other").unwrap());
}

#[test]
fn test_memory_audit_sink_keeps_order() {
    let sink = MemoryAuditSink::new();
    sink.record(AuditEntry::new("config.create", "bmi", "system", AuditSeverity::Info));
    sink.record(AuditEntry::new("config.delete", "bmi", "alice", AuditSeverity::Warning));
    let actions: Vec<String> = sink.entries().into_iter().map(|e| e.action).collect();
    assert_eq!(actions, vec!["config.create".to_string(), "config.delete".to_string()]);
}

#[test]
fn test_format_lookup() {
    assert_eq!(ConfigFormat::from_name("JSON"), Some(ConfigFormat::Json));
    assert_eq!(ConfigFormat::from_name("ini"), None);
    assert_eq!(
        ConfigFormat::from_path(std::path::Path::new("calc.json")),
        Some(ConfigFormat::Json)
    );
    assert_eq!(ConfigFormat::Json.extension(), "json");
}

#[cfg(feature = "yaml-config")]
#[test]
fn test_yaml_config_update() {
    let update: ConfigUpdate = ConfigFormat::Yaml
        .decode("enabled: false\nenvironment: staging\nsettings:\n  retries: 2\n")
        .unwrap();
    assert_eq!(update.enabled, Some(false));
    assert_eq!(update.environment, Some(Environment::Staging));
    assert_eq!(update.settings.unwrap()["retries"], json!(2));
    assert_eq!(ConfigFormat::from_name("yml"), Some(ConfigFormat::Yaml));
}

#[cfg(feature = "toml-config")]
#[test]
fn test_toml_config_update() {
    let update: ConfigUpdate = ConfigFormat::Toml
        .decode("environment = \"production\"\n\n[settings]\ndebug = true\n")
        .unwrap();
    assert_eq!(update.environment, Some(Environment::Production));
    assert_eq!(update.settings.unwrap()["debug"], json!(true));
}

#[test]
fn test_decode_error_names_the_format() {
    let err = ConfigFormat::Json.decode::<ConfigUpdate>("{").unwrap_err();
    match err {
        StorageSystemError::DeserializationError { format, .. } => assert_eq!(format, "json"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_environment_parsing() {
    assert_eq!("prod".parse::<Environment>(), Ok(Environment::Production));
    assert_eq!("Development".parse::<Environment>(), Ok(Environment::Development));
    assert!("moon".parse::<Environment>().is_err());
}
