//! # Abacus Storage
//!
//! Plugin configuration and the collaborators it persists through.
//!
//! - **[`schema`]**: the recursive settings validator and the sensitive-value sweep.
//! - **[`config`]**: templates, per-plugin config instances, change history
//!   and watchers ([`ConfigManager`]).
//! - **[`provider`]** / **[`local`]**: the key/value [`StorageProvider`]
//!   contract with in-memory and filesystem implementations.
//! - **[`audit`]**: the write-only [`AuditSink`].
//! - **[`format`]**: JSON, YAML and TOML encodings for config documents.
pub mod audit;
pub mod config;
pub mod error;
pub mod format;
pub mod local;
pub mod provider;
pub mod schema;

pub use audit::{AuditEntry, AuditSeverity, AuditSink, LogAuditSink, MemoryAuditSink};
pub use config::{
    ConfigManager, ConfigManagerOptions, ConfigStats, ConfigTemplate, ConfigUpdate, Environment,
    PluginConfigInstance,
};
pub use error::StorageSystemError;
pub use format::ConfigFormat;
pub use local::LocalStorageProvider;
pub use provider::{MemoryStorageProvider, StorageProvider};
pub use schema::{ConfigSchema, ObjectSchema, PropertySchema, SchemaKind, ValidationReport};

#[cfg(test)]
mod tests;
