//! # Abacus Storage System Errors
//!
//! Defines [`StorageSystemError`], covering persisted-config I/O,
//! (de)serialization and the configuration errors raised by the
//! [`ConfigManager`](crate::storage::config::ConfigManager): unknown or
//! malformed templates, unsupported environments and schema violations.
//! These are always returned as values, never panicked.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageSystemError {
    #[error("I/O error during operation '{operation}' on path '{path}': {source}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization to '{format}' failed: {source}")]
    SerializationError {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Deserialization from '{format}' failed: {source}")]
    DeserializationError {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Unsupported configuration format: {0}")]
    UnsupportedConfigFormat(String),

    #[error("Invalid storage key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Invalid config template '{template_id}': {message}")]
    InvalidTemplate { template_id: String, message: String },

    #[error("Config template not found: {0}")]
    TemplateNotFound(String),

    #[error("Environment '{environment}' is not supported by template '{template_id}'")]
    UnsupportedEnvironment {
        template_id: String,
        environment: String,
    },

    #[error("Configuration already exists for plugin '{0}'")]
    ConfigExists(String),

    #[error("Configuration not found for plugin '{0}'")]
    ConfigNotFound(String),

    #[error("Invalid configuration for '{plugin_id}': {}", errors.join("; "))]
    SchemaViolation {
        plugin_id: String,
        errors: Vec<String>,
    },

    #[error("Internal storage error: {0}")]
    InternalError(String),
}

impl StorageSystemError {
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        StorageSystemError::Io {
            source,
            operation: operation.into(),
            path,
        }
    }

    /// True for errors caused by the settings themselves rather than by storage
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            StorageSystemError::InvalidTemplate { .. }
                | StorageSystemError::TemplateNotFound(_)
                | StorageSystemError::UnsupportedEnvironment { .. }
                | StorageSystemError::SchemaViolation { .. }
        )
    }
}
