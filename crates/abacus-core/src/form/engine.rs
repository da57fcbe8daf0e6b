//! Stateful form: current values, touched fields, collapse state and errors.
//!
//! Visibility is never cached. Every query evaluates section and field
//! conditions against the current values, so a value change is reflected
//! by the next render or validation.
use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use serde_json::Value;

use crate::form::condition::is_satisfied;
use crate::form::descriptor::{FieldDescriptor, FormLayout, RendererKind, SectionDescriptor};
use crate::plugin_system::traits::{FieldErrors, Inputs};
use crate::kernel::constants::DEFAULT_LOCALE;
use crate::utils::compiled_pattern;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedOption {
    pub value: Value,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedField {
    pub id: String,
    pub renderer: RendererKind,
    pub label: String,
    pub description: Option<String>,
    pub placeholder: Option<String>,
    pub unit: Option<String>,
    pub value: Option<Value>,
    pub required: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub options: Vec<RenderedOption>,
    /// Present only when the error may be shown
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedSection {
    pub id: String,
    /// `None` for the implicit section wrapping a flat field list
    pub title: Option<String>,
    pub collapsible: bool,
    pub collapsed: bool,
    /// Empty while collapsed
    pub fields: Vec<RenderedField>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderedForm {
    pub sections: Vec<RenderedSection>,
}

impl RenderedForm {
    pub fn fields(&self) -> impl Iterator<Item = &RenderedField> {
        self.sections.iter().flat_map(|s| s.fields.iter())
    }

    pub fn field(&self, id: &str) -> Option<&RenderedField> {
        self.fields().find(|f| f.id == id)
    }

    pub fn field_ids(&self) -> Vec<&str> {
        self.fields().map(|f| f.id.as_str()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct FormEngine {
    sections: Vec<SectionDescriptor>,
    flat: bool,
    values: Inputs,
    touched: BTreeSet<String>,
    collapsed: HashMap<String, bool>,
    errors: FieldErrors,
    show_errors_immediately: bool,
    locale: String,
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

impl FormEngine {
    /// Build a form seeded with every field's default value
    pub fn new(layout: &FormLayout) -> Self {
        let (sections, flat) = match layout {
            FormLayout::Sections(sections) => (sections.clone(), false),
            FormLayout::Fields(fields) => {
                let mut implicit = SectionDescriptor::new("", "", fields.clone());
                implicit.collapsible = false;
                (vec![implicit], true)
            }
        };

        let values = sections
            .iter()
            .flat_map(|s| s.fields.iter())
            .filter_map(|f| f.default_value.clone().map(|v| (f.id.clone(), v)))
            .collect();
        let collapsed = sections
            .iter()
            .map(|s| (s.id.clone(), s.collapsible && s.collapsed))
            .collect();

        Self {
            sections,
            flat,
            values,
            touched: BTreeSet::new(),
            collapsed,
            errors: FieldErrors::new(),
            show_errors_immediately: false,
            locale: DEFAULT_LOCALE.to_string(),
        }
    }

    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = locale.to_string();
        self
    }

    /// Show errors on untouched fields too
    pub fn show_errors_immediately(mut self, enabled: bool) -> Self {
        self.show_errors_immediately = enabled;
        self
    }

    fn all_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.sections.iter().flat_map(|s| s.fields.iter())
    }

    pub fn field(&self, id: &str) -> Option<&FieldDescriptor> {
        self.all_fields().find(|f| f.id == id)
    }

    pub fn values(&self) -> &Inputs {
        &self.values
    }

    pub fn value(&self, id: &str) -> Option<&Value> {
        self.values.get(id)
    }

    /// Set a field's value. Returns false for unknown fields.
    pub fn set_value(&mut self, id: &str, value: Value) -> bool {
        if self.field(id).is_none() {
            log::debug!("Ignoring value for unknown field '{}'", id);
            return false;
        }
        self.values.insert(id.to_string(), value);
        self.errors.remove(id);
        true
    }

    pub fn clear_value(&mut self, id: &str) -> Option<Value> {
        self.errors.remove(id);
        self.values.remove(id)
    }

    pub fn touch(&mut self, id: &str) {
        if self.field(id).is_some() {
            self.touched.insert(id.to_string());
        }
    }

    pub fn touch_all_visible(&mut self) {
        let ids: Vec<String> = self.visible_fields().iter().map(|f| f.id.clone()).collect();
        self.touched.extend(ids);
    }

    pub fn is_touched(&self, id: &str) -> bool {
        self.touched.contains(id)
    }

    /// Flip a section's collapse state. Returns the new state, or `None`
    /// for unknown or non-collapsible sections.
    pub fn toggle_section(&mut self, id: &str) -> Option<bool> {
        let collapsible = self.sections.iter().find(|s| s.id == id)?.collapsible;
        if !collapsible {
            return None;
        }
        let state = self.collapsed.entry(id.to_string()).or_insert(false);
        *state = !*state;
        Some(*state)
    }

    pub fn is_collapsed(&self, id: &str) -> bool {
        self.collapsed.get(id).copied().unwrap_or(false)
    }

    fn section_visible(&self, section: &SectionDescriptor) -> bool {
        is_satisfied(section.condition.as_ref(), &self.values)
    }

    /// Fields whose section and own condition are both satisfied, in order
    pub fn visible_fields(&self) -> Vec<&FieldDescriptor> {
        self.sections
            .iter()
            .filter(|s| self.section_visible(s))
            .flat_map(|s| s.fields.iter())
            .filter(|f| is_satisfied(f.condition.as_ref(), &self.values))
            .collect()
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.visible_fields().iter().any(|f| f.id == id)
    }

    /// Values of visible fields only; hidden fields never reach the calculator
    pub fn visible_inputs(&self) -> Inputs {
        self.visible_fields()
            .into_iter()
            .filter_map(|f| self.values.get(&f.id).map(|v| (f.id.clone(), v.clone())))
            .collect()
    }

    fn check_field(&self, field: &FieldDescriptor) -> Option<String> {
        let label = field.label.resolve(&self.locale);
        let value = self.values.get(&field.id);
        if is_blank(value) {
            return field.required.then(|| format!("{} is required", label));
        }
        let value = value?;

        if let Some(n) = value.as_f64() {
            if field.min.is_some_and(|min| n < min) || field.max.is_some_and(|max| n > max) {
                return Some(match (field.min, field.max) {
                    (Some(min), Some(max)) => format!("{} must be between {} and {}", label, min, max),
                    (Some(min), None) => format!("{} must be at least {}", label, min),
                    (None, Some(max)) => format!("{} must be at most {}", label, max),
                    (None, None) => format!("{} is out of range", label),
                });
            }
        }

        let rule = field.validation.as_ref()?;
        let rule_message = |fallback: String| {
            rule.message
                .as_ref()
                .map(|m| m.resolve(&self.locale).to_string())
                .unwrap_or(fallback)
        };
        if let Some(n) = value.as_f64() {
            if let Some(min) = rule.min.filter(|min| n < *min) {
                return Some(rule_message(format!("{} must be at least {}", label, min)));
            }
            if let Some(max) = rule.max.filter(|max| n > *max) {
                return Some(rule_message(format!("{} must be at most {}", label, max)));
            }
        }
        if let (Some(pattern), Some(text)) = (&rule.pattern, value.as_str()) {
            match compiled_pattern(pattern) {
                Ok(re) if re.is_match(text) => {}
                Ok(_) => return Some(rule_message(format!("{} has an invalid format", label))),
                Err(e) => log::warn!("Invalid pattern on field '{}': {}", field.id, e),
            }
        }
        None
    }

    /// Check required flags, bounds and rules on visible fields.
    ///
    /// Replaces the stored errors with the result.
    pub fn validate(&mut self) -> FieldErrors {
        let errors: FieldErrors = self
            .visible_fields()
            .into_iter()
            .filter_map(|f| self.check_field(f).map(|msg| (f.id.clone(), msg)))
            .collect();
        self.errors = errors.clone();
        errors
    }

    /// Replace stored errors, e.g. with those reported by the calculator
    pub fn set_errors(&mut self, errors: FieldErrors) {
        self.errors = errors;
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// The error for `id` if it may currently be shown
    pub fn visible_error(&self, id: &str) -> Option<&str> {
        if self.show_errors_immediately || self.touched.contains(id) {
            self.errors.get(id).map(String::as_str)
        } else {
            None
        }
    }

    fn render_field(&self, field: &FieldDescriptor) -> RenderedField {
        let locale = self.locale.as_str();
        RenderedField {
            id: field.id.clone(),
            renderer: field.field_type.renderer(),
            label: field.label.resolve(locale).to_string(),
            description: field.description.as_ref().map(|d| d.resolve(locale).to_string()),
            placeholder: field.placeholder.as_ref().map(|p| p.resolve(locale).to_string()),
            unit: field.unit.clone(),
            value: self.values.get(&field.id).cloned(),
            required: field.required,
            min: field.min,
            max: field.max,
            step: field.step,
            options: field
                .options
                .iter()
                .map(|o| RenderedOption {
                    value: o.value.clone(),
                    label: o.label.resolve(locale).to_string(),
                })
                .collect(),
            error: self.visible_error(&field.id).map(str::to_string),
        }
    }

    /// Render visible sections and fields in declaration order
    pub fn render(&self) -> RenderedForm {
        let sections = self
            .sections
            .iter()
            .filter(|s| self.section_visible(s))
            .map(|section| {
                let collapsed = self.is_collapsed(&section.id);
                let fields = if collapsed {
                    Vec::new()
                } else {
                    section
                        .fields
                        .iter()
                        .filter(|f| is_satisfied(f.condition.as_ref(), &self.values))
                        .map(|f| self.render_field(f))
                        .collect()
                };
                RenderedSection {
                    id: section.id.clone(),
                    title: (!self.flat).then(|| section.title.resolve(&self.locale).to_string()),
                    collapsible: section.collapsible,
                    collapsed,
                    fields,
                }
            })
            .collect();
        RenderedForm { sections }
    }
}
