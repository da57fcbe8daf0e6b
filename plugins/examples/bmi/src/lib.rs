//! Body mass index calculator.
//!
//! A flat form of two numeric fields (weight in kg, height in cm) scored as
//! `weight / height_m²`, rounded to one decimal, with WHO adult bands.
use abacus_core::form::{FieldDescriptor, FormLayout};
use abacus_core::plugin_system::bundle::{ChartKind, ScoreBand, VisualizationDescriptor};
use abacus_core::plugin_system::manifest::{LocalizedText, ManifestBuilder};
use abacus_core::plugin_system::traits::{FieldErrors, Inputs, ScoringError};
use abacus_core::plugin_system::version::VersionRange;
use abacus_core::storage::schema::{ObjectSchema, PropertySchema};
use abacus_core::{CalculatorConfig, ScoreResult, ScoringImpl, StaticPluginSource};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

pub const PLUGIN_ID: &str = "bmi";

const COMPATIBLE_API_REQ: &str = "^1.0";

/// Upper bounds of the underweight, normal and overweight bands
const UNDERWEIGHT_BELOW: f64 = 18.5;
const NORMAL_BELOW: f64 = 25.0;
const OVERWEIGHT_BELOW: f64 = 30.0;

#[derive(Debug, Default, Clone, Copy)]
pub struct BmiScoring;

fn number(inputs: &Inputs, key: &str) -> Option<f64> {
    inputs.get(key).and_then(Value::as_f64)
}

fn classify(bmi: f64) -> &'static str {
    if bmi < UNDERWEIGHT_BELOW {
        "Underweight"
    } else if bmi < NORMAL_BELOW {
        "Normal weight"
    } else if bmi < OVERWEIGHT_BELOW {
        "Overweight"
    } else {
        "Obese"
    }
}

#[async_trait]
impl ScoringImpl for BmiScoring {
    async fn validate(&self, inputs: &Inputs) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match number(inputs, "weight") {
            Some(w) if w > 0.0 => {}
            Some(_) => {
                errors.insert("weight".into(), "Weight must be positive".into());
            }
            None => {
                errors.insert("weight".into(), "Weight must be a number".into());
            }
        }
        match number(inputs, "height") {
            Some(h) if h > 0.0 => {}
            Some(_) => {
                errors.insert("height".into(), "Height must be positive".into());
            }
            None => {
                errors.insert("height".into(), "Height must be a number".into());
            }
        }
        errors
    }

    async fn compute(&self, inputs: &Inputs) -> Result<ScoreResult, ScoringError> {
        let weight = number(inputs, "weight").ok_or("weight is missing")?;
        let height_cm = number(inputs, "height").ok_or("height is missing")?;
        if height_cm <= 0.0 {
            return Err(ScoringError::new("height must be greater than zero"));
        }
        let height_m = height_cm / 100.0;
        let bmi = ((weight / (height_m * height_m)) * 10.0).round() / 10.0;
        log::debug!("bmi: {} kg / {} cm -> {}", weight, height_cm, bmi);

        Ok(ScoreResult::new(bmi)
            .with_unit("kg/m²")
            .with_interpretation(classify(bmi)))
    }
}

fn api_range() -> VersionRange {
    match VersionRange::from_constraint(COMPATIBLE_API_REQ) {
        Ok(range) => range,
        Err(e) => {
            log::error!("Failed to parse API requirement for {}: {}", PLUGIN_ID, e);
            VersionRange::any()
        }
    }
}

fn inputs(weight: f64, height: f64) -> Inputs {
    let mut map = Map::new();
    map.insert("weight".into(), json!(weight));
    map.insert("height".into(), json!(height));
    map
}

pub fn config() -> CalculatorConfig {
    let manifest = ManifestBuilder::new(PLUGIN_ID, "org.abacus.examples", env!("CARGO_PKG_VERSION"))
        .name(LocalizedText::new("Body Mass Index").with("de", "Body-Mass-Index"))
        .description(LocalizedText::new(
            "Weight relative to height squared, classified into adult WHO bands",
        ))
        .author("Abacus Developers")
        .license("MIT")
        .compatibility(api_range())
        .tags(&["anthropometry", "adult"])
        .build();

    let mut weight = FieldDescriptor::numeric("weight", "Weight")
        .required()
        .bounds(1.0, 500.0)
        .step(0.1)
        .unit("kg")
        .default_value(70.0);
    weight.label = weight.label.with("de", "Gewicht");

    let mut height = FieldDescriptor::numeric("height", "Height")
        .required()
        .bounds(30.0, 272.0)
        .unit("cm")
        .default_value(175.0);
    height.label = height.label.with("de", "Größe");

    let settings = ObjectSchema::new().property(
        "decimals",
        PropertySchema::integer()
            .bounds(Some(0.0), Some(3.0))
            .with_default(json!(1))
            .describe("Display precision hosts use for the result"),
    );
    let defaults = settings.defaults();

    CalculatorConfig::new(manifest, FormLayout::Fields(vec![weight, height]))
        .with_required_inputs(&["weight", "height"])
        .with_smoke_test(inputs(80.0, 200.0), Some(json!(20.0)))
        .with_settings(settings, defaults)
}

pub fn visualization() -> VisualizationDescriptor {
    VisualizationDescriptor {
        chart: ChartKind::Scale,
        bands: vec![
            ScoreBand::new(0.0, UNDERWEIGHT_BELOW, "Underweight"),
            ScoreBand::new(UNDERWEIGHT_BELOW, NORMAL_BELOW, "Normal"),
            ScoreBand::new(NORMAL_BELOW, OVERWEIGHT_BELOW, "Overweight"),
            ScoreBand::new(OVERWEIGHT_BELOW, f64::MAX, "Obese"),
        ],
    }
}

/// In-process source for static registration with a host
pub fn source() -> StaticPluginSource {
    StaticPluginSource::new(config(), BmiScoring).with_visualization(visualization())
}
