use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plugin_system::version::VersionRange;

/// Represents a dependency on another plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDependency {
    /// The id of the required plugin
    pub plugin_id: String,

    /// The version range that is acceptable
    #[serde(default)]
    pub version_range: Option<VersionRange>,

    /// Whether this is a hard requirement or optional dependency
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

/// Error that can occur when resolving dependencies
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DependencyError {
    /// The required plugin was not found
    #[error("Required plugin not found: {0}")]
    MissingPlugin(String),

    /// The plugin was found, but the version is incompatible
    #[error("Plugin version mismatch: '{plugin_id}' requires version '{required_range}' but found '{actual_version}'")]
    IncompatibleVersion {
        plugin_id: String,
        required_range: VersionRange,
        actual_version: String,
    },
}

impl PluginDependency {
    /// Create a new required dependency with a specific version range
    pub fn required(plugin_id: &str, version_range: VersionRange) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            version_range: Some(version_range),
            required: true,
        }
    }

    /// Create a new required dependency with any version
    pub fn required_any(plugin_id: &str) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            version_range: None,
            required: true,
        }
    }

    /// Create a new optional dependency with a specific version range
    pub fn optional(plugin_id: &str, version_range: VersionRange) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            version_range: Some(version_range),
            required: false,
        }
    }

    /// Check if this dependency is compatible with the given plugin version string
    pub fn is_compatible_with(&self, version_str: &str) -> bool {
        match self.version_range {
            Some(ref range) => {
                let ok = range.includes_str(version_str);
                if !ok {
                    log::debug!(
                        "Version '{}' of '{}' does not satisfy '{}'",
                        version_str,
                        self.plugin_id,
                        range
                    );
                }
                ok
            }
            // No version range means any version is acceptable
            None => true,
        }
    }

    /// Resolve this dependency against the installed version of its target, if any.
    pub fn resolve(&self, installed_version: Option<&str>) -> Result<(), DependencyError> {
        match installed_version {
            None => Err(DependencyError::MissingPlugin(self.plugin_id.clone())),
            Some(version) if self.is_compatible_with(version) => Ok(()),
            Some(version) => Err(DependencyError::IncompatibleVersion {
                plugin_id: self.plugin_id.clone(),
                required_range: self.version_range.clone().unwrap_or_else(VersionRange::any),
                actual_version: version.to_string(),
            }),
        }
    }
}

impl fmt::Display for PluginDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let requirement_type = if self.required { "Requires" } else { "Optional" };
        match &self.version_range {
            Some(range) => write!(
                f,
                "{} plugin: {} (version: {})",
                requirement_type,
                self.plugin_id,
                range.constraint_string()
            ),
            None => write!(f, "{} plugin: {} (any version)", requirement_type, self.plugin_id),
        }
    }
}
