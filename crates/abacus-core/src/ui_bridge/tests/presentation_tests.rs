use serde_json::json;

use crate::form::descriptor::{FieldDescriptor, FormLayout};
use crate::form::engine::FormEngine;
use crate::plugin_system::bundle::{ScoreBand, VisualizationDescriptor};
use crate::plugin_system::manifest::PluginManifest;
use crate::plugin_system::traits::{FormattedResult, ScoreResult};
use crate::ui_bridge::presentation::{
    Block, GenericPresentation, MessageSeverity, Presentation, RenderContext,
};

#[test]
fn test_generic_presentation_shows_value_interpretation_and_band() {
    let manifest = PluginManifest::new("bmi", "clinical", "1.0.0", "BMI", "Abacus");
    let mut engine = FormEngine::new(&FormLayout::Fields(vec![
        FieldDescriptor::numeric("weight", "Weight").unit("kg"),
    ]));
    engine.set_value("weight", json!(70));
    let form = engine.render();
    let score = ScoreResult::new(22.86)
        .with_unit("kg/m²")
        .with_interpretation("Normal weight");
    let result = FormattedResult::generic(&score);
    let visualization = VisualizationDescriptor {
        bands: vec![ScoreBand::new(18.5, 25.0, "Normal"), ScoreBand::new(25.0, 30.0, "Overweight")],
        ..VisualizationDescriptor::default()
    };

    let ctx = RenderContext {
        plugin_id: "bmi",
        manifest: &manifest,
        locale: "en",
        form: &form,
        score: Some(&score),
        result: Some(&result),
        error_message: None,
        visualization: Some(&visualization),
    };
    let output = GenericPresentation.render(&ctx).unwrap();

    assert_eq!(output.result(), Some(("22.9 kg/m²", Some("Normal weight"))));
    assert!(output.blocks.contains(&Block::Band { label: "Normal".to_string() }));

    let text = output.to_text();
    assert!(text.contains("# BMI"));
    assert!(text.contains("Weight: 70 kg"));
    assert!(text.contains("Result: 22.9 kg/m²"));
    assert!(text.contains("Band: Normal"));
}

#[test]
fn test_generic_presentation_shows_error_notice() {
    let manifest = PluginManifest::new("bmi", "clinical", "1.0.0", "BMI", "Abacus");
    let form = FormEngine::new(&FormLayout::default()).render();
    let ctx = RenderContext {
        plugin_id: "bmi",
        manifest: &manifest,
        locale: "en",
        form: &form,
        score: None,
        result: None,
        error_message: Some("Height must be greater than zero"),
        visualization: None,
    };
    let output = GenericPresentation.render(&ctx).unwrap();
    assert!(output.result().is_none());
    assert!(output.blocks.contains(&Block::Notice {
        severity: MessageSeverity::Error,
        text: "Height must be greater than zero".to_string(),
    }));
}
