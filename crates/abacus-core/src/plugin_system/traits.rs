use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::plugin_system::bundle::{CalculatorConfig, VisualizationDescriptor};
use crate::plugin_system::error::PluginSystemError;
use crate::ui_bridge::presentation::Presentation;

/// Untyped inputs keyed by field id. The runtime never coerces them.
pub type Inputs = Map<String, Value>;

/// Field id -> error message
pub type FieldErrors = BTreeMap<String, String>;

/// Error returned by a scoring implementation's `compute`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ScoringError {
    pub message: String,
}

impl ScoringError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl From<&str> for ScoringError {
    fn from(message: &str) -> Self {
        ScoringError::new(message)
    }
}

impl From<String> for ScoringError {
    fn from(message: String) -> Self {
        ScoringError::new(message)
    }
}

/// Raw output of `compute`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub value: Value,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub interpretation: Option<String>,
    #[serde(default)]
    pub details: Map<String, Value>,
}

impl ScoreResult {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            unit: None,
            interpretation: None,
            details: Map::new(),
        }
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    pub fn with_interpretation(mut self, interpretation: &str) -> Self {
        self.interpretation = Some(interpretation.to_string());
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// The value as a number, if it is one
    pub fn numeric(&self) -> Option<f64> {
        self.value.as_f64()
    }
}

/// Display-ready form of a [`ScoreResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedResult {
    pub headline: String,
    pub interpretation: Option<String>,
    pub details: Vec<(String, String)>,
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() != 0.0 => format!("{:.1}", f),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

impl FormattedResult {
    /// "value unit" headline plus interpretation and details as-is
    pub fn generic(result: &ScoreResult) -> Self {
        let value = display_value(&result.value);
        let headline = match &result.unit {
            Some(unit) => format!("{} {}", value, unit),
            None => value,
        };
        Self {
            headline,
            interpretation: result.interpretation.clone(),
            details: result
                .details
                .iter()
                .map(|(k, v)| (k.clone(), display_value(v)))
                .collect(),
        }
    }
}

/// The fixed contract every calculator implements.
///
/// Only `compute` is mandatory. Implementations must have no side effects
/// beyond their return value: a timed-out call is dropped and its eventual
/// outcome ignored.
#[async_trait]
pub trait ScoringImpl: Send + Sync {
    /// Field-level checks run before `compute`. Any returned error aborts the run.
    async fn validate(&self, _inputs: &Inputs) -> FieldErrors {
        FieldErrors::new()
    }

    async fn compute(&self, inputs: &Inputs) -> Result<ScoreResult, ScoringError>;

    fn format(&self, result: &ScoreResult) -> FormattedResult {
        FormattedResult::generic(result)
    }
}

/// Where the loader fetches a plugin's artifacts from.
///
/// `Ok(None)` means the artifact does not exist; `Err` means fetching it
/// failed. Both make a missing config descriptor or scoring implementation
/// a load failure.
#[async_trait]
pub trait PluginSource: Send + Sync {
    fn id(&self) -> &str;

    async fn config_descriptor(&self) -> Result<Option<CalculatorConfig>, PluginSystemError>;

    async fn scoring(&self) -> Result<Option<Arc<dyn ScoringImpl>>, PluginSystemError>;

    async fn visualization(&self) -> Result<Option<VisualizationDescriptor>, PluginSystemError> {
        Ok(None)
    }

    fn presentation(&self) -> Option<Arc<dyn Presentation>> {
        None
    }
}
