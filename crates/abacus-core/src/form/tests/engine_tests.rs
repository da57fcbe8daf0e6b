use serde_json::json;

use crate::form::descriptor::{
    ChoiceOption, Condition, ConditionOperator, FieldDescriptor, FormLayout, SectionDescriptor,
    ValidationRule,
};
use crate::form::engine::FormEngine;
use crate::plugin_system::manifest::LocalizedText;

fn pregnancy_layout() -> FormLayout {
    FormLayout::Sections(vec![
        SectionDescriptor::new(
            "basics",
            "Basics",
            vec![
                FieldDescriptor::choice_group(
                    "sex",
                    "Sex",
                    vec![ChoiceOption::new("female", "Female"), ChoiceOption::new("male", "Male")],
                )
                .required(),
                FieldDescriptor::numeric("weeks", "Weeks pregnant")
                    .required()
                    .bounds(0.0, 42.0)
                    .when(Condition::new("sex", ConditionOperator::Equals, "female")),
            ],
        ),
        SectionDescriptor::new(
            "advanced",
            "Advanced",
            vec![FieldDescriptor::numeric("age", "Age").default_value(30)],
        )
        .collapsed(),
    ])
}

#[test]
fn test_defaults_seed_values() {
    let form = FormEngine::new(&pregnancy_layout());
    assert_eq!(form.value("age"), Some(&json!(30)));
    assert_eq!(form.value("weeks"), None);
}

#[test]
fn test_hidden_field_excluded_from_render_and_validation() {
    let mut form = FormEngine::new(&pregnancy_layout());
    form.set_value("sex", json!("male"));

    assert!(!form.is_visible("weeks"));
    assert!(form.render().field("weeks").is_none());
    let errors = form.validate();
    assert!(!errors.contains_key("weeks"));
    assert!(errors.is_empty());

    form.set_value("sex", json!("female"));
    assert!(form.is_visible("weeks"));
    assert!(form.render().field("weeks").is_some());
    assert_eq!(form.validate().get("weeks").map(String::as_str), Some("Weeks pregnant is required"));
}

#[test]
fn test_hidden_values_do_not_reach_inputs() {
    let mut form = FormEngine::new(&pregnancy_layout());
    form.set_value("sex", json!("female"));
    form.set_value("weeks", json!(12));
    assert!(form.visible_inputs().contains_key("weeks"));

    form.set_value("sex", json!("male"));
    let inputs = form.visible_inputs();
    assert!(!inputs.contains_key("weeks"));
    assert_eq!(inputs.get("age"), Some(&json!(30)));
    // The value itself is kept for when the field reappears
    assert_eq!(form.value("weeks"), Some(&json!(12)));
}

#[test]
fn test_bounds_messages() {
    let mut form = FormEngine::new(&pregnancy_layout());
    form.set_value("sex", json!("female"));
    form.set_value("weeks", json!(50));
    assert_eq!(
        form.validate().get("weeks").map(String::as_str),
        Some("Weeks pregnant must be between 0 and 42")
    );
}

#[test]
fn test_errors_shown_only_after_touch() {
    let mut form = FormEngine::new(&pregnancy_layout());
    form.validate();
    assert!(form.errors().contains_key("sex"));
    assert_eq!(form.visible_error("sex"), None);
    assert_eq!(form.render().field("sex").unwrap().error, None);

    form.touch("sex");
    assert!(form.is_touched("sex"));
    assert_eq!(form.visible_error("sex"), Some("Sex is required"));
    assert_eq!(form.render().field("sex").unwrap().error.as_deref(), Some("Sex is required"));
}

#[test]
fn test_show_errors_immediately_mode() {
    let mut form = FormEngine::new(&pregnancy_layout()).show_errors_immediately(true);
    form.validate();
    assert_eq!(form.visible_error("sex"), Some("Sex is required"));
}

#[test]
fn test_setting_a_value_clears_its_error() {
    let mut form = FormEngine::new(&pregnancy_layout());
    form.validate();
    assert!(form.set_value("sex", json!("male")));
    assert!(!form.errors().contains_key("sex"));
    assert!(!form.set_value("unknown", json!(1)));
}

#[test]
fn test_sections_collapse_independently() {
    let mut form = FormEngine::new(&pregnancy_layout());
    assert!(form.is_collapsed("advanced"));
    assert!(!form.is_collapsed("basics"));

    let rendered = form.render();
    let advanced = rendered.sections.iter().find(|s| s.id == "advanced").unwrap();
    assert!(advanced.collapsed);
    assert!(advanced.fields.is_empty());

    assert_eq!(form.toggle_section("advanced"), Some(false));
    assert!(form.render().field("age").is_some());
    assert!(!form.is_collapsed("basics"));
    assert_eq!(form.toggle_section("missing"), None);

    // Collapsed sections still count for validation and inputs
    form.toggle_section("advanced");
    assert!(form.visible_inputs().contains_key("age"));
}

#[test]
fn test_section_condition_hides_all_fields() {
    let layout = FormLayout::Sections(vec![
        SectionDescriptor::new("main", "Main", vec![FieldDescriptor::numeric("score", "Score")]),
        SectionDescriptor::new(
            "followup",
            "Follow-up",
            vec![FieldDescriptor::numeric("detail", "Detail").required()],
        )
        .when(Condition::new("score", ConditionOperator::GreaterThan, 5)),
    ]);
    let mut form = FormEngine::new(&layout);
    assert_eq!(form.render().sections.len(), 1);
    assert!(form.validate().is_empty());

    form.set_value("score", json!(8));
    assert_eq!(form.render().sections.len(), 2);
    assert!(form.validate().contains_key("detail"));
}

#[test]
fn test_flat_layout_renders_one_untitled_section() {
    let layout = FormLayout::Fields(vec![
        FieldDescriptor::numeric("weight", "Weight").unit("kg"),
        FieldDescriptor::numeric("height", "Height").unit("cm"),
    ]);
    let mut form = FormEngine::new(&layout);
    let rendered = form.render();
    assert_eq!(rendered.sections.len(), 1);
    assert_eq!(rendered.sections[0].title, None);
    assert!(!rendered.sections[0].collapsible);
    assert_eq!(rendered.field_ids(), vec!["weight", "height"]);
    assert_eq!(rendered.field("weight").unwrap().unit.as_deref(), Some("kg"));
    assert_eq!(form.toggle_section(""), None);
}

#[test]
fn test_validation_rule_with_custom_message() {
    let layout = FormLayout::Fields(vec![
        FieldDescriptor::numeric("dose", "Dose").rule(ValidationRule {
            min: Some(1.0),
            max: None,
            pattern: None,
            message: Some(LocalizedText::new("Dose too low").with("de", "Dosis zu niedrig")),
        }),
        FieldDescriptor::new("code", crate::form::descriptor::FieldType::Text, "Code").rule(
            ValidationRule {
                pattern: Some("^[A-Z]{3}$".to_string()),
                ..ValidationRule::default()
            },
        ),
    ]);
    let mut form = FormEngine::new(&layout).with_locale("de");
    form.set_value("dose", json!(0.5));
    form.set_value("code", json!("abc"));
    let errors = form.validate();
    assert_eq!(errors.get("dose").map(String::as_str), Some("Dosis zu niedrig"));
    assert_eq!(errors.get("code").map(String::as_str), Some("Code has an invalid format"));

    form.set_value("dose", json!(2));
    form.set_value("code", json!("ABC"));
    assert!(form.validate().is_empty());
}

#[test]
fn test_touch_all_visible_skips_hidden_fields() {
    let mut form = FormEngine::new(&pregnancy_layout());
    form.set_value("sex", json!("male"));
    form.touch_all_visible();
    assert!(form.is_touched("sex"));
    assert!(form.is_touched("age"));
    assert!(!form.is_touched("weeks"));
}

#[test]
fn test_localized_labels_and_options() {
    let layout = FormLayout::Fields(vec![FieldDescriptor::choice_group(
        "answer",
        "Answer",
        vec![ChoiceOption::new(1, "Yes")],
    )]);
    let form = FormEngine::new(&layout).with_locale("fr");
    let rendered = form.render();
    let field = rendered.field("answer").unwrap();
    assert_eq!(field.label, "Answer");
    assert_eq!(field.options[0].label, "Yes");
    assert_eq!(field.options[0].value, json!(1));
}
