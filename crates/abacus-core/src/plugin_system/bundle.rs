use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::form::descriptor::FormLayout;
use crate::plugin_system::manifest::{LocalizedText, PluginManifest};
use crate::plugin_system::traits::{Inputs, ScoringImpl};
use crate::storage::schema::ConfigSchema;
use crate::ui_bridge::presentation::Presentation;

/// Fixed inputs run through the pipeline during install and validate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmokeTest {
    pub inputs: Inputs,
    /// When set, the computed value must match it
    #[serde(default)]
    pub expected: Option<Value>,
}

/// The config descriptor artifact: everything about a calculator except its code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatorConfig {
    pub manifest: PluginManifest,
    pub layout: FormLayout,
    /// Field ids the scoring implementation reads unconditionally
    #[serde(default)]
    pub required_inputs: Vec<String>,
    #[serde(default)]
    pub smoke_test: Option<SmokeTest>,
    /// Schema of the plugin's own settings; absent means the generic template applies
    #[serde(default)]
    pub settings_schema: Option<ConfigSchema>,
    #[serde(default)]
    pub default_settings: Map<String, Value>,
}

impl CalculatorConfig {
    pub fn new(manifest: PluginManifest, layout: FormLayout) -> Self {
        Self {
            manifest,
            layout,
            required_inputs: Vec::new(),
            smoke_test: None,
            settings_schema: None,
            default_settings: Map::new(),
        }
    }

    pub fn with_required_inputs(mut self, ids: &[&str]) -> Self {
        self.required_inputs = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn with_smoke_test(mut self, inputs: Inputs, expected: Option<Value>) -> Self {
        self.smoke_test = Some(SmokeTest { inputs, expected });
        self
    }

    pub fn with_settings(mut self, schema: ConfigSchema, defaults: Map<String, Value>) -> Self {
        self.settings_schema = Some(schema);
        self.default_settings = defaults;
        self
    }

    /// Inputs for the smoke run: the declared smoke inputs, or every field default
    pub fn smoke_inputs(&self) -> Inputs {
        match &self.smoke_test {
            Some(test) => test.inputs.clone(),
            None => self
                .layout
                .fields()
                .filter_map(|f| f.default_value.clone().map(|v| (f.id.clone(), v)))
                .collect(),
        }
    }

    /// Required input ids that no field declares
    pub fn undeclared_required_inputs(&self) -> Vec<String> {
        self.required_inputs
            .iter()
            .filter(|id| self.layout.field(id).is_none())
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Gauge,
    Bar,
    Scale,
}

/// A labelled score interval, `min <= score < max`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBand {
    pub min: f64,
    pub max: f64,
    pub label: LocalizedText,
}

impl ScoreBand {
    pub fn new(min: f64, max: f64, label: &str) -> Self {
        Self {
            min,
            max,
            label: LocalizedText::new(label),
        }
    }

    pub fn contains(&self, score: f64) -> bool {
        score >= self.min && score < self.max
    }
}

/// Optional visualization artifact
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VisualizationDescriptor {
    #[serde(default)]
    pub chart: ChartKind,
    #[serde(default)]
    pub bands: Vec<ScoreBand>,
}

impl VisualizationDescriptor {
    pub fn band_for(&self, score: f64) -> Option<&ScoreBand> {
        self.bands.iter().find(|b| b.contains(score))
    }
}

/// A fully loaded plugin, cached by id in the module loader
#[derive(Clone)]
pub struct ModuleBundle {
    pub config: CalculatorConfig,
    pub scoring: Arc<dyn ScoringImpl>,
    pub visualization: Option<VisualizationDescriptor>,
    pub presentation: Option<Arc<dyn Presentation>>,
}

impl ModuleBundle {
    pub fn id(&self) -> &str {
        &self.config.manifest.id
    }

    pub fn manifest(&self) -> &PluginManifest {
        &self.config.manifest
    }
}

impl fmt::Debug for ModuleBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleBundle")
            .field("id", &self.id())
            .field("version", &self.config.manifest.version)
            .field("fields", &self.config.layout.field_count())
            .field("visualization", &self.visualization.is_some())
            .field("presentation", &self.presentation.as_ref().map(|p| p.name().to_string()))
            .finish()
    }
}
