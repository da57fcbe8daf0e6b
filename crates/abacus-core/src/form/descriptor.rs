//! Declarative field and section descriptors.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::plugin_system::manifest::LocalizedText;

/// Input type of a field. Unknown type names deserialize to
/// [`FieldType::Unknown`] and render as numeric inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    #[serde(alias = "number")]
    Numeric,
    #[serde(alias = "select")]
    Choice,
    #[serde(alias = "radio")]
    ChoiceGroup,
    Boolean,
    Range,
    Text,
    #[serde(other)]
    Unknown,
}

/// Control used to render a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RendererKind {
    NumericInput,
    Select,
    Checkbox,
    RadioGroup,
    Slider,
    TextInput,
}

impl FieldType {
    pub fn renderer(self) -> RendererKind {
        match self {
            FieldType::Numeric | FieldType::Unknown => RendererKind::NumericInput,
            FieldType::Choice => RendererKind::Select,
            FieldType::ChoiceGroup => RendererKind::RadioGroup,
            FieldType::Boolean => RendererKind::Checkbox,
            FieldType::Range => RendererKind::Slider,
            FieldType::Text => RendererKind::TextInput,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    #[serde(alias = "eq")]
    Equals,
    #[serde(alias = "ne")]
    NotEquals,
    #[serde(alias = "gt")]
    GreaterThan,
    #[serde(alias = "lt")]
    LessThan,
    Contains,
    NotContains,
}

/// Visibility condition: `field <operator> value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: ConditionOperator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: &str, operator: ConditionOperator, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            operator,
            value: value.into(),
        }
    }
}

/// One entry of a choice or choice-group field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub value: Value,
    pub label: LocalizedText,
}

impl ChoiceOption {
    pub fn new(value: impl Into<Value>, label: &str) -> Self {
        Self {
            value: value.into(),
            label: LocalizedText::new(label),
        }
    }
}

/// Extra per-field constraints checked by the form before the plugin sees the inputs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub pattern: Option<String>,
    /// Replaces the generated message when the rule fails
    #[serde(default)]
    pub message: Option<LocalizedText>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: LocalizedText,
    #[serde(default)]
    pub description: Option<LocalizedText>,
    #[serde(default)]
    pub placeholder: Option<LocalizedText>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub step: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub options: Vec<ChoiceOption>,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub validation: Option<ValidationRule>,
    #[serde(default, rename = "default")]
    pub default_value: Option<Value>,
}

impl FieldDescriptor {
    pub fn new(id: &str, field_type: FieldType, label: &str) -> Self {
        Self {
            id: id.to_string(),
            field_type,
            label: LocalizedText::new(label),
            description: None,
            placeholder: None,
            required: false,
            min: None,
            max: None,
            step: None,
            unit: None,
            options: Vec::new(),
            condition: None,
            validation: None,
            default_value: None,
        }
    }

    pub fn numeric(id: &str, label: &str) -> Self {
        Self::new(id, FieldType::Numeric, label)
    }

    pub fn choice_group(id: &str, label: &str, options: Vec<ChoiceOption>) -> Self {
        let mut field = Self::new(id, FieldType::ChoiceGroup, label);
        field.options = options;
        field
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn bounds(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    pub fn placeholder(mut self, text: LocalizedText) -> Self {
        self.placeholder = Some(text);
        self
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn rule(mut self, rule: ValidationRule) -> Self {
        self.validation = Some(rule);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

fn default_collapsible() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDescriptor {
    pub id: String,
    pub title: LocalizedText,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default = "default_collapsible")]
    pub collapsible: bool,
    /// Initial collapse state
    #[serde(default)]
    pub collapsed: bool,
}

impl SectionDescriptor {
    pub fn new(id: &str, title: &str, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            id: id.to_string(),
            title: LocalizedText::new(title),
            fields,
            condition: None,
            collapsible: true,
            collapsed: false,
        }
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn collapsed(mut self) -> Self {
        self.collapsed = true;
        self
    }
}

/// Either an ordered section list or a flat field list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormLayout {
    Sections(Vec<SectionDescriptor>),
    Fields(Vec<FieldDescriptor>),
}

impl Default for FormLayout {
    fn default() -> Self {
        FormLayout::Fields(Vec::new())
    }
}

impl FormLayout {
    /// Every field in declaration order, regardless of visibility
    pub fn fields(&self) -> Box<dyn Iterator<Item = &FieldDescriptor> + '_> {
        match self {
            FormLayout::Sections(sections) => Box::new(sections.iter().flat_map(|s| s.fields.iter())),
            FormLayout::Fields(fields) => Box::new(fields.iter()),
        }
    }

    pub fn field(&self, id: &str) -> Option<&FieldDescriptor> {
        self.fields().find(|f| f.id == id)
    }

    pub fn field_count(&self) -> usize {
        self.fields().count()
    }

    /// Field ids that appear more than once
    pub fn duplicate_field_ids(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut duplicates = Vec::new();
        for field in self.fields() {
            if !seen.insert(field.id.as_str()) && !duplicates.contains(&field.id) {
                duplicates.push(field.id.clone());
            }
        }
        duplicates
    }
}
