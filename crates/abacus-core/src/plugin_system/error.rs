//! # Abacus Plugin System Errors
//!
//! Defines [`PluginSystemError`], the error enum for loading calculator
//! modules, creating runtime instances and driving the plugin lifecycle.
//!
//! A `ModuleUnavailable` error is the load failure hosts show as
//! "module unavailable"; it is always returned, never panicked.
use crate::plugin_system::dependency::DependencyError;
use crate::plugin_system::version::VersionError;

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    #[error("Module '{plugin_id}' is unavailable: {reason}")]
    ModuleUnavailable { plugin_id: String, reason: String },

    #[error("Failed to fetch artifact '{artifact}' for '{plugin_id}': {message}")]
    ArtifactError {
        plugin_id: String,
        artifact: String,
        message: String,
    },

    #[error("Plugin registration error for '{plugin_id}': {message}")]
    RegistrationError { plugin_id: String, message: String },

    #[error("Container '{container}' already has an instance under construction")]
    Busy { container: String },

    #[error("No runtime instance mounted in container '{0}'")]
    InstanceNotFound(String),

    #[error("Lifecycle error for '{plugin_id}' during {phase}: {message}")]
    LifecycleError {
        plugin_id: String,
        phase: String,
        message: String,
    },

    #[error("Plugin '{plugin_id}' cannot go from {from} to {to}")]
    InvalidTransition {
        plugin_id: String,
        from: String,
        to: String,
    },

    #[error("Plugin manifest error for '{plugin_id}': {message}")]
    ManifestError { plugin_id: String, message: String },

    #[error("Dependency resolution failed: {0}")]
    DependencyResolution(#[from] DependencyError),

    #[error("Version parsing error: {0}")]
    VersionParsing(#[from] VersionError),

    #[error("Internal plugin system error: {0}")]
    InternalError(String),
}

impl PluginSystemError {
    pub fn unavailable(plugin_id: &str, reason: impl Into<String>) -> Self {
        PluginSystemError::ModuleUnavailable {
            plugin_id: plugin_id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn lifecycle(plugin_id: &str, phase: &str, message: impl Into<String>) -> Self {
        PluginSystemError::LifecycleError {
            plugin_id: plugin_id.to_string(),
            phase: phase.to_string(),
            message: message.into(),
        }
    }

    /// True for the "busy, try again" outcome of instance creation
    pub fn is_busy(&self) -> bool {
        matches!(self, PluginSystemError::Busy { .. })
    }
}
