use std::sync::Arc;

use serde_json::{json, Map};

use crate::form::descriptor::{FieldDescriptor, FormLayout};
use crate::plugin_system::bundle::{CalculatorConfig, ModuleBundle};
use crate::plugin_system::compatibility::{check_compatibility, IssueCategory, IssueSeverity};
use crate::plugin_system::dependency::PluginDependency;
use crate::plugin_system::registry::PluginRegistry;
use crate::plugin_system::tests::fixtures::{bmi_config, BmiScoring};
use crate::plugin_system::version::VersionRange;
use crate::storage::schema::{ObjectSchema, PropertySchema};
use crate::ui_bridge::presentation::GenericPresentation;

fn bundle(config: CalculatorConfig) -> ModuleBundle {
    ModuleBundle {
        config,
        scoring: Arc::new(BmiScoring),
        visualization: None,
        presentation: Some(Arc::new(GenericPresentation)),
    }
}

#[test]
fn test_clean_bundle_is_compatible() {
    let report = check_compatibility(&bundle(bmi_config()), &PluginRegistry::new(), "1.0.0");
    assert!(report.is_compatible());
    assert!(report.issues.is_empty());
}

#[test]
fn test_missing_presentation_is_a_warning() {
    let mut bundle = bundle(bmi_config());
    bundle.presentation = None;
    let report = check_compatibility(&bundle, &PluginRegistry::new(), "1.0.0");
    assert!(report.is_compatible());
    let warnings: Vec<_> = report.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].category, IssueCategory::Configuration);
}

#[test]
fn test_dependencies() {
    let mut config = bmi_config();
    config
        .manifest
        .add_dependency(PluginDependency::required("units", VersionRange::from_constraint("^2").unwrap()))
        .add_dependency(PluginDependency::required_any("growth-charts"))
        .add_dependency(PluginDependency::optional("export", VersionRange::any()));

    let registry = PluginRegistry::new();
    registry.mark_installed("units", "1.4.0");
    let report = check_compatibility(&bundle(config), &registry, "1.0.0");

    assert!(!report.is_compatible());
    let errors: Vec<String> = report.errors().map(|i| i.message.clone()).collect();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].contains("'units' requires version '^2' but found '1.4.0'"));
    assert_eq!(errors[1], "Required dependency 'growth-charts' is not installed");

    let warning = report.warnings().next().unwrap();
    assert_eq!(warning.category, IssueCategory::Dependency);
    assert_eq!(
        warning.to_string(),
        "[warning/dependency] Optional dependency 'export' is not installed \
         (Install 'export' to enable the features that use it)"
    );
}

#[test]
fn test_runtime_api_range() {
    let mut config = bmi_config();
    config.manifest.compatibility = VersionRange::from_constraint("^2").unwrap();
    let report = check_compatibility(&bundle(config.clone()), &PluginRegistry::new(), "1.0.0");
    let error = report.errors().next().unwrap();
    assert_eq!(error.category, IssueCategory::Api);
    assert_eq!(error.severity, IssueSeverity::Error);
    assert!(error.message.contains("outside the supported range '^2'"));

    let report = check_compatibility(&bundle(config), &PluginRegistry::new(), "2.3.0");
    assert!(report.is_compatible());
}

#[test]
fn test_invalid_default_settings() {
    let schema = ObjectSchema::new().property(
        "retries",
        PropertySchema::integer().bounds(Some(0.0), Some(10.0)),
    );
    let mut defaults = Map::new();
    defaults.insert("retries".to_string(), json!(99));
    let config = bmi_config().with_settings(schema, defaults);

    let report = check_compatibility(&bundle(config), &PluginRegistry::new(), "1.0.0");
    let messages: Vec<&str> = report.errors().map(|i| i.message.as_str()).collect();
    assert_eq!(
        messages,
        vec!["Default settings are invalid: retries: Value 99 is greater than maximum 10"]
    );
}

#[test]
fn test_layout_problems() {
    let mut config = bmi_config().with_required_inputs(&["weight", "height", "sex"]);
    config.layout = FormLayout::Fields(vec![
        FieldDescriptor::numeric("weight", "Weight"),
        FieldDescriptor::numeric("height", "Height"),
        FieldDescriptor::numeric("weight", "Weight again"),
    ]);
    let report = check_compatibility(&bundle(config), &PluginRegistry::new(), "1.0.0");
    let messages: Vec<&str> = report.errors().map(|i| i.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "Field id 'weight' is declared more than once",
            "Required input 'sex' has no field descriptor",
        ]
    );
}
