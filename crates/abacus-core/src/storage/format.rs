use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::storage::error::StorageSystemError;

/// Text formats config documents can be read from and written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_name)
    }

    /// Parse a format name or extension ("json", "yml", ...)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "json" => Some(ConfigFormat::Json),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            #[cfg(feature = "toml-config")]
            "toml" => Some(ConfigFormat::Toml),
            _ => None,
        }
    }

    /// Serialize a value in this format
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<String, StorageSystemError> {
        let serialization_error = |source: Box<dyn std::error::Error + Send + Sync>| {
            StorageSystemError::SerializationError {
                format: self.extension().to_string(),
                source,
            }
        };
        match self {
            ConfigFormat::Json => {
                serde_json::to_string_pretty(value).map_err(|e| serialization_error(Box::new(e)))
            }
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => {
                serde_yaml::to_string(value).map_err(|e| serialization_error(Box::new(e)))
            }
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => {
                toml::to_string_pretty(value).map_err(|e| serialization_error(Box::new(e)))
            }
        }
    }

    /// Deserialize a value from text in this format
    pub fn decode<T: DeserializeOwned>(&self, data: &str) -> Result<T, StorageSystemError> {
        let deserialization_error = |source: Box<dyn std::error::Error + Send + Sync>| {
            StorageSystemError::DeserializationError {
                format: self.extension().to_string(),
                source,
            }
        };
        match self {
            ConfigFormat::Json => {
                serde_json::from_str(data).map_err(|e| deserialization_error(Box::new(e)))
            }
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => {
                serde_yaml::from_str(data).map_err(|e| deserialization_error(Box::new(e)))
            }
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data).map_err(|e| deserialization_error(Box::new(e))),
        }
    }
}
