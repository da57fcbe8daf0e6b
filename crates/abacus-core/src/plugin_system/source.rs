//! Built-in [`PluginSource`] implementations.
//!
//! [`StaticPluginSource`] serves artifacts that are compiled into the host.
//! [`FilePluginSource`] reads the config descriptor from a JSON/YAML/TOML
//! document on disk and pairs it with an in-process scoring implementation.
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::fs;

use crate::form::descriptor::{FieldDescriptor, FormLayout, SectionDescriptor};
use crate::plugin_system::bundle::{CalculatorConfig, SmokeTest, VisualizationDescriptor};
use crate::plugin_system::dependency::PluginDependency;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::manifest::{LocalizedText, PluginManifest};
use crate::plugin_system::traits::{PluginSource, ScoringImpl};
use crate::plugin_system::version::VersionRange;
use crate::storage::format::ConfigFormat;
use crate::storage::schema::ConfigSchema;
use crate::ui_bridge::presentation::Presentation;

/// A plugin whose artifacts live in memory
#[derive(Clone)]
pub struct StaticPluginSource {
    id: String,
    config: Option<CalculatorConfig>,
    scoring: Option<Arc<dyn ScoringImpl>>,
    visualization: Option<VisualizationDescriptor>,
    presentation: Option<Arc<dyn Presentation>>,
}

impl StaticPluginSource {
    /// A complete source; the id is taken from the manifest
    pub fn new<S: ScoringImpl + 'static>(config: CalculatorConfig, scoring: S) -> Self {
        Self {
            id: config.manifest.id.clone(),
            config: Some(config),
            scoring: Some(Arc::new(scoring)),
            visualization: None,
            presentation: None,
        }
    }

    /// A source with no artifacts yet
    pub fn empty(id: &str) -> Self {
        Self {
            id: id.to_string(),
            config: None,
            scoring: None,
            visualization: None,
            presentation: None,
        }
    }

    pub fn with_config(mut self, config: CalculatorConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_scoring(mut self, scoring: Arc<dyn ScoringImpl>) -> Self {
        self.scoring = Some(scoring);
        self
    }

    pub fn with_visualization(mut self, visualization: VisualizationDescriptor) -> Self {
        self.visualization = Some(visualization);
        self
    }

    pub fn with_presentation(mut self, presentation: Arc<dyn Presentation>) -> Self {
        self.presentation = Some(presentation);
        self
    }
}

impl fmt::Debug for StaticPluginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticPluginSource")
            .field("id", &self.id)
            .field("config", &self.config.is_some())
            .field("scoring", &self.scoring.is_some())
            .field("visualization", &self.visualization.is_some())
            .field("presentation", &self.presentation.is_some())
            .finish()
    }
}

#[async_trait]
impl PluginSource for StaticPluginSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn config_descriptor(&self) -> Result<Option<CalculatorConfig>, PluginSystemError> {
        Ok(self.config.clone())
    }

    async fn scoring(&self) -> Result<Option<Arc<dyn ScoringImpl>>, PluginSystemError> {
        Ok(self.scoring.clone())
    }

    async fn visualization(&self) -> Result<Option<VisualizationDescriptor>, PluginSystemError> {
        Ok(self.visualization.clone())
    }

    fn presentation(&self) -> Option<Arc<dyn Presentation>> {
        self.presentation.clone()
    }
}

// --- Intermediate structs for deserialization ---

#[derive(Deserialize, Debug)]
struct RawDependencyInfo {
    id: String,
    #[serde(default)]
    version_range: Option<String>,
    #[serde(default = "default_required")]
    required: bool,
}

fn default_required() -> bool {
    true
}

#[derive(Deserialize, Debug)]
struct RawPluginInfo {
    id: String,
    #[serde(default)]
    namespace: String,
    version: String,
    name: LocalizedText,
    #[serde(default)]
    description: LocalizedText,
    #[serde(default)]
    author: String,
    #[serde(default)]
    license: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    dependencies: Vec<RawDependencyInfo>,
    /// Supported runtime API range, e.g. "^1.0"
    #[serde(default)]
    api: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawCalculatorConfig {
    plugin: RawPluginInfo,
    #[serde(default)]
    fields: Vec<FieldDescriptor>,
    #[serde(default)]
    sections: Vec<SectionDescriptor>,
    #[serde(default)]
    required_inputs: Vec<String>,
    #[serde(default)]
    smoke_test: Option<SmokeTest>,
    #[serde(default)]
    settings_schema: Option<ConfigSchema>,
    #[serde(default)]
    default_settings: Map<String, Value>,
}

fn manifest_error(plugin_id: &str, message: String) -> PluginSystemError {
    PluginSystemError::ManifestError {
        plugin_id: plugin_id.to_string(),
        message,
    }
}

impl RawCalculatorConfig {
    fn into_config(self) -> Result<CalculatorConfig, PluginSystemError> {
        let raw = self.plugin;
        let plugin_id = raw.id.clone();

        let compatibility = match raw.api.as_deref() {
            Some(api) => VersionRange::from_str(api).map_err(|e| {
                manifest_error(&plugin_id, format!("Failed to parse API version range '{}': {}", api, e))
            })?,
            None => VersionRange::any(),
        };

        let mut manifest = PluginManifest {
            id: raw.id,
            namespace: raw.namespace,
            version: raw.version,
            name: raw.name,
            description: raw.description,
            author: raw.author,
            license: raw.license,
            tags: raw.tags,
            dependencies: Vec::new(),
            compatibility,
        };

        for raw_dep in raw.dependencies {
            let version_range = match raw_dep.version_range {
                Some(range) => Some(VersionRange::from_str(&range).map_err(|e| {
                    manifest_error(
                        &plugin_id,
                        format!(
                            "Failed to parse dependency version range '{}' for dep '{}': {}",
                            range, raw_dep.id, e
                        ),
                    )
                })?),
                None => None,
            };
            manifest.add_dependency(PluginDependency {
                plugin_id: raw_dep.id,
                version_range,
                required: raw_dep.required,
            });
        }

        let layout = match (self.sections.is_empty(), self.fields.is_empty()) {
            (false, false) => {
                return Err(manifest_error(
                    &plugin_id,
                    "declare either 'fields' or 'sections', not both".to_string(),
                ));
            }
            (false, true) => FormLayout::Sections(self.sections),
            (true, _) => FormLayout::Fields(self.fields),
        };

        Ok(CalculatorConfig {
            manifest,
            layout,
            required_inputs: self.required_inputs,
            smoke_test: self.smoke_test,
            settings_schema: self.settings_schema,
            default_settings: self.default_settings,
        })
    }
}

/// Parse a config descriptor document.
///
/// The document has a `[plugin]` table (id, namespace, version, name,
/// description, author, license, tags, dependencies, api) plus either
/// `fields` or `sections`, and optional `required_inputs`, `smoke_test`,
/// `settings_schema` and `default_settings`.
pub fn parse_config_descriptor(data: &str, format: ConfigFormat) -> Result<CalculatorConfig, PluginSystemError> {
    let raw: RawCalculatorConfig = format.decode(data).map_err(|e| PluginSystemError::ArtifactError {
        plugin_id: "<unknown>".to_string(),
        artifact: "config".to_string(),
        message: e.to_string(),
    })?;
    raw.into_config()
}

/// Config descriptor from a file plus an in-process scoring implementation
pub struct FilePluginSource {
    id: String,
    config_path: PathBuf,
    scoring: Arc<dyn ScoringImpl>,
    visualization_path: Option<PathBuf>,
    presentation: Option<Arc<dyn Presentation>>,
}

impl FilePluginSource {
    pub fn new<S: ScoringImpl + 'static>(id: &str, config_path: impl Into<PathBuf>, scoring: S) -> Self {
        Self {
            id: id.to_string(),
            config_path: config_path.into(),
            scoring: Arc::new(scoring),
            visualization_path: None,
            presentation: None,
        }
    }

    pub fn with_visualization_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.visualization_path = Some(path.into());
        self
    }

    pub fn with_presentation(mut self, presentation: Arc<dyn Presentation>) -> Self {
        self.presentation = Some(presentation);
        self
    }

    fn artifact_error(&self, artifact: &str, message: String) -> PluginSystemError {
        PluginSystemError::ArtifactError {
            plugin_id: self.id.clone(),
            artifact: artifact.to_string(),
            message,
        }
    }

    /// Read a document, mapping a missing file to `Ok(None)`
    async fn read_document(&self, artifact: &str, path: &Path) -> Result<Option<(String, ConfigFormat)>, PluginSystemError> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            self.artifact_error(artifact, format!("unsupported file type: {}", path.display()))
        })?;
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some((content, format))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.artifact_error(artifact, format!("{}: {}", path.display(), e))),
        }
    }
}

impl fmt::Debug for FilePluginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePluginSource")
            .field("id", &self.id)
            .field("config_path", &self.config_path)
            .field("visualization_path", &self.visualization_path)
            .finish()
    }
}

#[async_trait]
impl PluginSource for FilePluginSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn config_descriptor(&self) -> Result<Option<CalculatorConfig>, PluginSystemError> {
        let Some((content, format)) = self.read_document("config", &self.config_path).await? else {
            return Ok(None);
        };
        let config = parse_config_descriptor(&content, format)
            .map_err(|e| self.artifact_error("config", e.to_string()))?;
        if config.manifest.id != self.id {
            return Err(self.artifact_error(
                "config",
                format!("descriptor declares id '{}'", config.manifest.id),
            ));
        }
        Ok(Some(config))
    }

    async fn scoring(&self) -> Result<Option<Arc<dyn ScoringImpl>>, PluginSystemError> {
        Ok(Some(Arc::clone(&self.scoring)))
    }

    async fn visualization(&self) -> Result<Option<VisualizationDescriptor>, PluginSystemError> {
        let Some(path) = &self.visualization_path else {
            return Ok(None);
        };
        let Some((content, format)) = self.read_document("visualization", path).await? else {
            return Ok(None);
        };
        format
            .decode(&content)
            .map(Some)
            .map_err(|e| self.artifact_error("visualization", e.to_string()))
    }

    fn presentation(&self) -> Option<Arc<dyn Presentation>> {
        self.presentation.clone()
    }
}
