use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::kernel::constants;
use crate::plugin_system::dependency::PluginDependency;
use crate::plugin_system::version::{parse_version, VersionRange};

/// Text with one entry per locale ("en", "de", ...).
///
/// Deserializes from either a plain string (stored under the default locale)
/// or a locale -> text map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    /// Text available only in the default locale
    pub fn new(text: &str) -> Self {
        let mut map = BTreeMap::new();
        map.insert(constants::DEFAULT_LOCALE.to_string(), text.to_string());
        Self(map)
    }

    /// Add or replace a translation
    pub fn with(mut self, locale: &str, text: &str) -> Self {
        self.0.insert(locale.to_string(), text.to_string());
        self
    }

    /// Resolve the text for `locale`, falling back to the default locale and
    /// then to any translation at all.
    pub fn resolve(&self, locale: &str) -> &str {
        self.0
            .get(locale)
            .or_else(|| self.0.get(constants::DEFAULT_LOCALE))
            .or_else(|| self.0.values().next())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// True when no translation carries any text
    pub fn is_blank(&self) -> bool {
        self.0.values().all(|t| t.trim().is_empty())
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<&str> for LocalizedText {
    fn from(text: &str) -> Self {
        LocalizedText::new(text)
    }
}

impl<'de> Deserialize<'de> for LocalizedText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Plain(String),
            Map(BTreeMap<String, String>),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Plain(text) => LocalizedText::new(&text),
            Raw::Map(map) => LocalizedText(map),
        })
    }
}

/// Identity and compatibility metadata of a calculator plugin.
///
/// Immutable once installed; an upgrade replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Globally unique identifier for the plugin
    pub id: String,

    /// Publisher namespace, e.g. "org.example.cardiology"
    pub namespace: String,

    /// Plugin version (semver)
    pub version: String,

    /// Human-readable name
    pub name: LocalizedText,

    /// Plugin description
    #[serde(default)]
    pub description: LocalizedText,

    /// Plugin author
    #[serde(default)]
    pub author: String,

    /// License information
    #[serde(default)]
    pub license: Option<String>,

    /// Tags for categorization
    #[serde(default)]
    pub tags: Vec<String>,

    /// Plugin dependencies
    #[serde(default)]
    pub dependencies: Vec<PluginDependency>,

    /// Runtime API versions this plugin works with
    #[serde(default = "VersionRange::any")]
    pub compatibility: VersionRange,
}

impl PluginManifest {
    /// Create a new plugin manifest
    pub fn new(id: &str, namespace: &str, version: &str, name: &str, author: &str) -> Self {
        Self {
            id: id.to_string(),
            namespace: namespace.to_string(),
            version: version.to_string(),
            name: LocalizedText::new(name),
            description: LocalizedText::default(),
            author: author.to_string(),
            license: None,
            tags: Vec::new(),
            dependencies: Vec::new(),
            compatibility: VersionRange::any(),
        }
    }

    /// Names of the fields that keep this manifest from being complete.
    ///
    /// An empty list means the manifest can be installed.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.id.trim().is_empty() {
            missing.push("id");
        }
        if self.namespace.trim().is_empty() {
            missing.push("namespace");
        }
        if parse_version(&self.version).is_err() {
            missing.push("version");
        }
        if self.name.is_blank() {
            missing.push("name");
        }
        if self.description.is_blank() {
            missing.push("description");
        }
        if self.author.trim().is_empty() {
            missing.push("author");
        }
        missing
    }

    /// True when every mandatory field is present and the version parses
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Add a dependency
    pub fn add_dependency(&mut self, dependency: PluginDependency) -> &mut Self {
        self.dependencies.push(dependency);
        self
    }

    /// Add a tag to the plugin
    pub fn add_tag(&mut self, tag: &str) -> &mut Self {
        self.tags.push(tag.to_string());
        self
    }
}

/// Builder for creating a plugin manifest
pub struct ManifestBuilder {
    manifest: PluginManifest,
}

impl ManifestBuilder {
    /// Create a new manifest builder
    pub fn new(id: &str, namespace: &str, version: &str) -> Self {
        Self {
            manifest: PluginManifest::new(id, namespace, version, id, ""),
        }
    }

    /// Set the localized plugin name
    pub fn name(mut self, name: LocalizedText) -> Self {
        self.manifest.name = name;
        self
    }

    /// Set the localized plugin description
    pub fn description(mut self, description: LocalizedText) -> Self {
        self.manifest.description = description;
        self
    }

    /// Set the plugin author
    pub fn author(mut self, author: &str) -> Self {
        self.manifest.author = author.to_string();
        self
    }

    /// Set the plugin license
    pub fn license(mut self, license: &str) -> Self {
        self.manifest.license = Some(license.to_string());
        self
    }

    /// Set the supported runtime API range
    pub fn compatibility(mut self, range: VersionRange) -> Self {
        self.manifest.compatibility = range;
        self
    }

    /// Add a dependency
    pub fn dependency(mut self, dependency: PluginDependency) -> Self {
        self.manifest.add_dependency(dependency);
        self
    }

    /// Add a tag to the plugin
    pub fn tag(mut self, tag: &str) -> Self {
        self.manifest.add_tag(tag);
        self
    }

    /// Add multiple tags to the plugin
    pub fn tags(mut self, tags: &[&str]) -> Self {
        for tag in tags {
            self.manifest.add_tag(tag);
        }
        self
    }

    /// Build the manifest
    pub fn build(self) -> PluginManifest {
        self.manifest
    }
}
