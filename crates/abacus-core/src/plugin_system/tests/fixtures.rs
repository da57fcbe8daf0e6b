//! Calculators and sources shared by the plugin system and kernel tests.
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{broadcast, Notify};

use crate::event::types::RuntimeEvent;
use crate::form::descriptor::{
    ChoiceOption, Condition, ConditionOperator, FieldDescriptor, FormLayout, SectionDescriptor,
};
use crate::plugin_system::bundle::{CalculatorConfig, VisualizationDescriptor};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::manifest::{LocalizedText, ManifestBuilder, PluginManifest};
use crate::plugin_system::source::StaticPluginSource;
use crate::plugin_system::traits::{
    FieldErrors, Inputs, PluginSource, ScoreResult, ScoringError, ScoringImpl,
};
use crate::ui_bridge::error::RenderError;
use crate::ui_bridge::presentation::{Presentation, RenderContext, RenderedOutput};

pub(crate) fn inputs(value: Value) -> Inputs {
    value.as_object().cloned().unwrap()
}

pub(crate) fn manifest(id: &str) -> PluginManifest {
    ManifestBuilder::new(id, "org.abacus.test", "1.0.0")
        .name(LocalizedText::new("Body Mass Index"))
        .description(LocalizedText::new("Weight relative to height"))
        .author("Abacus Test Suite")
        .build()
}

/// weight (kg) / height (m)^2, with height entered in centimetres
pub(crate) struct BmiScoring;

#[async_trait]
impl ScoringImpl for BmiScoring {
    async fn validate(&self, inputs: &Inputs) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for key in ["weight", "height"] {
            if !inputs.get(key).is_some_and(Value::is_number) {
                errors.insert(key.to_string(), format!("{} must be a number", key));
            }
        }
        errors
    }

    async fn compute(&self, inputs: &Inputs) -> Result<ScoreResult, ScoringError> {
        let weight = inputs.get("weight").and_then(Value::as_f64).unwrap_or_default();
        let height = inputs.get("height").and_then(Value::as_f64).unwrap_or_default();
        if height <= 0.0 {
            return Err(ScoringError::new("height must be greater than zero"));
        }
        let metres = height / 100.0;
        let bmi = weight / (metres * metres);
        let interpretation = if bmi < 18.5 {
            "Underweight"
        } else if bmi < 25.0 {
            "Normal weight"
        } else {
            "Overweight"
        };
        Ok(ScoreResult::new(bmi)
            .with_unit("kg/m²")
            .with_interpretation(interpretation))
    }
}

pub(crate) fn bmi_config_with_id(id: &str) -> CalculatorConfig {
    CalculatorConfig::new(
        manifest(id),
        FormLayout::Fields(vec![
            FieldDescriptor::numeric("weight", "Weight")
                .required()
                .bounds(1.0, 500.0)
                .unit("kg")
                .default_value(80),
            FieldDescriptor::numeric("height", "Height")
                .required()
                .unit("cm")
                .default_value(200),
        ]),
    )
    .with_required_inputs(&["weight", "height"])
    .with_smoke_test(inputs(json!({ "weight": 80, "height": 200 })), Some(json!(20.0)))
}

pub(crate) fn bmi_config() -> CalculatorConfig {
    bmi_config_with_id("bmi")
}

pub(crate) fn bmi_source() -> StaticPluginSource {
    StaticPluginSource::new(bmi_config(), BmiScoring)
}

/// Sums every numeric input it receives and records what it was given
#[derive(Default)]
pub(crate) struct RecordingScoring {
    pub seen: Arc<Mutex<Vec<Inputs>>>,
}

#[async_trait]
impl ScoringImpl for RecordingScoring {
    async fn compute(&self, inputs: &Inputs) -> Result<ScoreResult, ScoringError> {
        self.seen.lock().unwrap().push(inputs.clone());
        Ok(ScoreResult::new(inputs.values().filter_map(Value::as_f64).sum::<f64>()))
    }
}

/// Two sections; "bonus" is only shown in full mode
pub(crate) fn conditional_config() -> CalculatorConfig {
    CalculatorConfig::new(
        manifest("conditional"),
        FormLayout::Sections(vec![
            SectionDescriptor::new(
                "main",
                "Main",
                vec![
                    FieldDescriptor::choice_group(
                        "mode",
                        "Mode",
                        vec![ChoiceOption::new("basic", "Basic"), ChoiceOption::new("full", "Full")],
                    )
                    .default_value("basic"),
                    FieldDescriptor::numeric("base", "Base").default_value(1),
                ],
            ),
            SectionDescriptor::new(
                "extra",
                "Extra",
                vec![FieldDescriptor::numeric("bonus", "Bonus")
                    .required()
                    .when(Condition::new("mode", ConditionOperator::Equals, "full"))],
            ),
        ]),
    )
    .with_smoke_test(inputs(json!({ "base": 1 })), Some(json!(1)))
}

/// A presentation that always fails
pub(crate) struct BrokenPresentation;

impl Presentation for BrokenPresentation {
    fn name(&self) -> &str {
        "broken"
    }

    fn render(&self, _ctx: &RenderContext<'_>) -> Result<RenderedOutput, RenderError> {
        Err(RenderError::failed("broken", "chart data missing"))
    }
}

/// Wraps a source and parks `config_descriptor` until `gate` is notified
pub(crate) struct GatedSource {
    pub inner: StaticPluginSource,
    pub entered: Arc<Notify>,
    pub gate: Arc<Notify>,
}

#[async_trait]
impl PluginSource for GatedSource {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn config_descriptor(&self) -> Result<Option<CalculatorConfig>, PluginSystemError> {
        self.entered.notify_one();
        self.gate.notified().await;
        self.inner.config_descriptor().await
    }

    async fn scoring(&self) -> Result<Option<Arc<dyn ScoringImpl>>, PluginSystemError> {
        self.inner.scoring().await
    }

    async fn visualization(&self) -> Result<Option<VisualizationDescriptor>, PluginSystemError> {
        Err(PluginSystemError::InternalError("visualization host offline".into()))
    }
}

/// Everything currently queued on a hub receiver
pub(crate) fn drain(rx: &mut broadcast::Receiver<RuntimeEvent>) -> Vec<RuntimeEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
