//! Glasgow Coma Scale.
//!
//! Eye, verbal and motor responses are radio groups in their own sections.
//! The verbal section is hidden for intubated patients; their verbal
//! component is recorded as "T" and counted as 1.
use std::sync::Arc;

use abacus_core::form::{
    ChoiceOption, Condition, ConditionOperator, FieldDescriptor, FieldType, FormLayout,
    SectionDescriptor,
};
use abacus_core::plugin_system::bundle::{ChartKind, ScoreBand, VisualizationDescriptor};
use abacus_core::plugin_system::manifest::{LocalizedText, ManifestBuilder};
use abacus_core::plugin_system::traits::{FieldErrors, FormattedResult, Inputs, ScoringError};
use abacus_core::plugin_system::version::VersionRange;
use abacus_core::ui_bridge::{Block, MessageSeverity, RenderContext, RenderError, RenderedOutput};
use abacus_core::{CalculatorConfig, Presentation, ScoreResult, ScoringImpl, StaticPluginSource};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

pub const PLUGIN_ID: &str = "gcs";

const COMPATIBLE_API_REQ: &str = "^1.0";

const EYE_MAX: i64 = 4;
const VERBAL_MAX: i64 = 5;
const MOTOR_MAX: i64 = 6;

/// Verbal score assumed when the patient is intubated
const INTUBATED_VERBAL: i64 = 1;

#[derive(Debug, Default, Clone, Copy)]
pub struct GcsScoring;

fn component(inputs: &Inputs, key: &str, max: i64) -> Result<i64, String> {
    match inputs.get(key).and_then(Value::as_i64) {
        Some(score) if (1..=max).contains(&score) => Ok(score),
        Some(score) => Err(format!("{} must be between 1 and {}, got {}", key, max, score)),
        None => Err(format!("{} response is required", key)),
    }
}

fn is_intubated(inputs: &Inputs) -> bool {
    inputs.get("intubated").and_then(Value::as_bool).unwrap_or(false)
}

fn severity(total: i64) -> &'static str {
    if total >= 13 {
        "Mild"
    } else if total >= 9 {
        "Moderate"
    } else {
        "Severe"
    }
}

#[async_trait]
impl ScoringImpl for GcsScoring {
    async fn validate(&self, inputs: &Inputs) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let mut check = |key: &str, max: i64| {
            if let Err(message) = component(inputs, key, max) {
                errors.insert(key.to_string(), message);
            }
        };
        check("eye", EYE_MAX);
        check("motor", MOTOR_MAX);
        if !is_intubated(inputs) {
            check("verbal", VERBAL_MAX);
        }
        errors
    }

    async fn compute(&self, inputs: &Inputs) -> Result<ScoreResult, ScoringError> {
        let eye = component(inputs, "eye", EYE_MAX)?;
        let motor = component(inputs, "motor", MOTOR_MAX)?;
        let (verbal, verbal_notation) = if is_intubated(inputs) {
            (INTUBATED_VERBAL, "T".to_string())
        } else {
            let verbal = component(inputs, "verbal", VERBAL_MAX)?;
            (verbal, verbal.to_string())
        };
        let total = eye + verbal + motor;

        Ok(ScoreResult::new(total)
            .with_interpretation(severity(total))
            .with_detail("notation", format!("E{} V{} M{}", eye, verbal_notation, motor))
            .with_detail("intubated", is_intubated(inputs)))
    }

    fn format(&self, result: &ScoreResult) -> FormattedResult {
        let mut formatted = FormattedResult::generic(result);
        formatted.headline = format!("GCS {}", formatted.headline);
        formatted
            .details
            .retain(|(key, _)| key.as_str() == "notation");
        formatted
    }
}

/// Result-first layout with the component notation and a severity banner
#[derive(Debug, Default, Clone, Copy)]
pub struct GcsPresentation;

impl Presentation for GcsPresentation {
    fn name(&self) -> &str {
        "gcs"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<RenderedOutput, RenderError> {
        let mut output = RenderedOutput::new().push(Block::Heading {
            text: ctx.manifest.name.resolve(ctx.locale).to_string(),
        });

        if let Some(result) = ctx.result {
            output = output.push(Block::Result {
                headline: result.headline.clone(),
                interpretation: result.interpretation.clone(),
                details: result.details.clone(),
            });
            let intubated = ctx
                .score
                .and_then(|s| s.details.get("intubated"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if intubated {
                output = output.push(Block::Notice {
                    severity: MessageSeverity::Info,
                    text: "Verbal response not assessable (intubated)".to_string(),
                });
            }
        }
        if let Some(message) = ctx.error_message {
            output = output.push(Block::Notice {
                severity: MessageSeverity::Error,
                text: message.to_string(),
            });
        }
        let band = ctx
            .visualization
            .zip(ctx.score.and_then(ScoreResult::numeric))
            .and_then(|(vis, score)| vis.band_for(score));
        if let Some(band) = band {
            let severity = if band.max <= 9.0 {
                MessageSeverity::Error
            } else {
                MessageSeverity::Info
            };
            output = output.push(Block::Notice {
                severity,
                text: band.label.resolve(ctx.locale).to_string(),
            });
        }

        Ok(output.push(Block::Form { form: ctx.form.clone() }))
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

fn options(labels: &[&str]) -> Vec<ChoiceOption> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| ChoiceOption::new(i as i64 + 1, label))
        .collect()
}

pub fn config() -> CalculatorConfig {
    let manifest = ManifestBuilder::new(PLUGIN_ID, "org.abacus.examples", env!("CARGO_PKG_VERSION"))
        .name(LocalizedText::new("Glasgow Coma Scale"))
        .description(LocalizedText::new(
            "Level of consciousness from eye, verbal and motor responses",
        ))
        .author("Abacus Developers")
        .license("MIT")
        .compatibility(api_range())
        .tags(&["neurology", "emergency"])
        .build();

    let eye = FieldDescriptor::choice_group(
        "eye",
        "Eye opening",
        options(&["None", "To pressure", "To sound", "Spontaneous"]),
    )
    .required()
    .default_value(EYE_MAX);

    let intubated = FieldDescriptor::new("intubated", FieldType::Boolean, "Intubated").default_value(false);

    let verbal = FieldDescriptor::choice_group(
        "verbal",
        "Verbal response",
        options(&["None", "Sounds", "Words", "Confused", "Oriented"]),
    )
    .required()
    .default_value(VERBAL_MAX);

    let motor = FieldDescriptor::choice_group(
        "motor",
        "Motor response",
        options(&[
            "None",
            "Extension",
            "Abnormal flexion",
            "Normal flexion",
            "Localising",
            "Obeys commands",
        ]),
    )
    .required()
    .default_value(MOTOR_MAX);

    let layout = FormLayout::Sections(vec![
        SectionDescriptor::new("eye", "Eyes", vec![eye, intubated]),
        SectionDescriptor::new("verbal", "Verbal", vec![verbal])
            .when(Condition::new("intubated", ConditionOperator::Equals, false)),
        SectionDescriptor::new("motor", "Motor", vec![motor]),
    ]);

    let mut smoke = Map::new();
    smoke.insert("eye".into(), json!(EYE_MAX));
    smoke.insert("verbal".into(), json!(VERBAL_MAX));
    smoke.insert("motor".into(), json!(MOTOR_MAX));

    CalculatorConfig::new(manifest, layout)
        .with_required_inputs(&["eye", "motor"])
        .with_smoke_test(smoke, Some(json!(15)))
}

pub fn visualization() -> VisualizationDescriptor {
    VisualizationDescriptor {
        chart: ChartKind::Bar,
        bands: vec![
            ScoreBand::new(3.0, 9.0, "Severe brain injury"),
            ScoreBand::new(9.0, 13.0, "Moderate brain injury"),
            ScoreBand::new(13.0, 16.0, "Mild brain injury"),
        ],
    }
}

/// In-process source for static registration with a host
pub fn source() -> StaticPluginSource {
    StaticPluginSource::new(config(), GcsScoring)
        .with_visualization(visualization())
        .with_presentation(Arc::new(GcsPresentation))
}

#[cfg(test)]
mod tests {
    use super::*;

    use abacus_core::plugin_system::lifecycle::LifecycleState;
    use abacus_core::{Application, ContainerId, InstanceOptions};

    fn inputs(pairs: &[(&str, Value)]) -> Inputs {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[tokio::test]
    async fn test_full_score_is_mild() {
        let result = GcsScoring
            .compute(&inputs(&[("eye", json!(4)), ("verbal", json!(5)), ("motor", json!(6))]))
            .await
            .unwrap();
        assert_eq!(result.value, json!(15));
        assert_eq!(result.interpretation.as_deref(), Some("Mild"));
        assert_eq!(result.details.get("notation"), Some(&json!("E4 V5 M6")));
    }

    #[tokio::test]
    async fn test_intubated_patient_scores_verbal_as_t() {
        let result = GcsScoring
            .compute(&inputs(&[
                ("eye", json!(2)),
                ("motor", json!(4)),
                ("intubated", json!(true)),
            ]))
            .await
            .unwrap();
        assert_eq!(result.value, json!(7));
        assert_eq!(result.interpretation.as_deref(), Some("Severe"));
        assert_eq!(result.details.get("notation"), Some(&json!("E2 VT M4")));
    }

    #[tokio::test]
    async fn test_validate_reports_out_of_range_components() {
        let errors = GcsScoring
            .validate(&inputs(&[("eye", json!(7)), ("motor", json!(6))]))
            .await;
        assert_eq!(
            errors.get("eye").map(String::as_str),
            Some("eye must be between 1 and 4, got 7")
        );
        assert_eq!(errors.get("verbal").map(String::as_str), Some("verbal response is required"));
        assert!(!errors.contains_key("motor"));
    }

    #[test]
    fn test_format_prefixes_headline_and_keeps_notation_only() {
        let result = ScoreResult::new(10)
            .with_interpretation("Moderate")
            .with_detail("notation", "E3 V3 M4")
            .with_detail("intubated", false);
        let formatted = GcsScoring.format(&result);
        assert_eq!(formatted.headline, "GCS 10");
        assert_eq!(formatted.details, vec![("notation".to_string(), "E3 V3 M4".to_string())]);
    }

    #[tokio::test]
    async fn test_instance_hides_verbal_section_when_intubated() {
        let mut app = Application::in_memory();
        app.run().await.unwrap();
        app.register_plugin(Arc::new(source())).unwrap();
        assert_eq!(app.install_plugin(PLUGIN_ID).await.unwrap(), LifecycleState::Active);

        let report = app.check_compatibility(PLUGIN_ID).await.unwrap();
        assert!(report.is_compatible());
        assert_eq!(report.warnings().count(), 0);

        let handle = app
            .create_instance(PLUGIN_ID, ContainerId::new("ward"), InstanceOptions::default())
            .await
            .unwrap();
        assert!(handle.set_input("intubated", json!(true)).await);
        assert!(handle.set_input("motor", json!(5)).await);

        let result = handle.calculate().await.unwrap();
        assert_eq!(result.value, json!(10));

        let text = handle.output_text().await.unwrap();
        assert!(text.contains("Result: GCS 10"));
        assert!(text.contains("notation: E4 VT M5"));
        assert!(text.contains("Moderate brain injury"));
        assert!(text.contains("- Motor"));
        assert!(!text.contains("Verbal response:"));
    }
}
