//! Recursive validation of configuration settings.
//!
//! A [`ConfigSchema`] is an [`ObjectSchema`]: a set of named
//! [`PropertySchema`]s plus a required-key list. Properties of kind
//! `object` and `array` carry nested schemas, so one recursive visitor
//! validates any depth. Validation is pure; running it twice on the same
//! pair yields the same report.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::compiled_pattern;

/// Root schema of a plugin's settings map
pub type ConfigSchema = ObjectSchema;

/// The type of a property and the constraints that only make sense for that type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SchemaKind {
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
    },
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
    },
    Boolean,
    Array {
        items: Box<PropertySchema>,
    },
    Object(ObjectSchema),
}

impl SchemaKind {
    fn type_name(&self) -> &'static str {
        match self {
            SchemaKind::String { .. } => "string",
            SchemaKind::Number { .. } => "number",
            SchemaKind::Integer { .. } => "integer",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Array { .. } => "array",
            SchemaKind::Object(_) => "object",
        }
    }
}

/// Schema of a single property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(flatten)]
    pub kind: SchemaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    /// Sensitive properties are stripped from exports
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PropertySchema {
    fn of(kind: SchemaKind) -> Self {
        Self {
            kind,
            default: None,
            enum_values: None,
            sensitive: false,
            description: None,
        }
    }

    pub fn string() -> Self {
        Self::of(SchemaKind::String { pattern: None })
    }

    pub fn number() -> Self {
        Self::of(SchemaKind::Number { minimum: None, maximum: None })
    }

    pub fn integer() -> Self {
        Self::of(SchemaKind::Integer { minimum: None, maximum: None })
    }

    pub fn boolean() -> Self {
        Self::of(SchemaKind::Boolean)
    }

    pub fn array(items: PropertySchema) -> Self {
        Self::of(SchemaKind::Array { items: Box::new(items) })
    }

    pub fn object(schema: ObjectSchema) -> Self {
        Self::of(SchemaKind::Object(schema))
    }

    /// Set numeric bounds. Ignored for non-numeric kinds.
    pub fn bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        match &mut self.kind {
            SchemaKind::Number { minimum, maximum } | SchemaKind::Integer { minimum, maximum } => {
                *minimum = min;
                *maximum = max;
            }
            _ => {}
        }
        self
    }

    /// Set a regex the string must match. Ignored for non-string kinds.
    pub fn pattern(mut self, regex: &str) -> Self {
        if let SchemaKind::String { pattern } = &mut self.kind {
            *pattern = Some(regex.to_string());
        }
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// Named properties plus the keys that must be present
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectSchema {
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a property
    pub fn property(mut self, name: &str, schema: PropertySchema) -> Self {
        self.properties.insert(name.to_string(), schema);
        self
    }

    /// Mark a key as required
    pub fn require(mut self, name: &str) -> Self {
        self.required.push(name.to_string());
        self
    }

    /// Declared defaults, recursing into nested objects
    pub fn defaults(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for (name, prop) in &self.properties {
            if let Some(default) = &prop.default {
                out.insert(name.clone(), default.clone());
            } else if let SchemaKind::Object(nested) = &prop.kind {
                let nested_defaults = nested.defaults();
                if !nested_defaults.is_empty() {
                    out.insert(name.clone(), Value::Object(nested_defaults));
                }
            }
        }
        out
    }
}

/// One problem found while validating, located by a dotted path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaIssue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Outcome of [`validate`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<SchemaIssue>,
    pub warnings: Vec<SchemaIssue>,
}

impl ValidationReport {
    /// Errors rendered as "path: message" strings
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    fn error(&mut self, path: &str, message: String) {
        self.errors.push(SchemaIssue { path: path.to_string(), message });
    }

    fn warning(&mut self, path: &str, message: String) {
        self.warnings.push(SchemaIssue { path: path.to_string(), message });
    }
}

/// Validate `value` against `schema`.
///
/// Required keys are checked first, then every declared property that is
/// present: type, enum membership, numeric bounds, string pattern, and
/// nested array items / objects. Undeclared keys produce warnings.
pub fn validate(value: &Value, schema: &ConfigSchema) -> ValidationReport {
    let mut report = ValidationReport::default();
    visit_object(value, schema, "", &mut report);
    report.valid = report.errors.is_empty();
    report
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn visit_object(value: &Value, schema: &ObjectSchema, path: &str, report: &mut ValidationReport) {
    let Some(map) = value.as_object() else {
        report.error(path, format!("Expected object, found {}", json_type_name(value)));
        return;
    };

    for key in &schema.required {
        if map.get(key).is_none_or(Value::is_null) {
            report.error(&join_path(path, key), "Missing required property".to_string());
        }
    }

    for (key, child) in map {
        let child_path = join_path(path, key);
        match schema.properties.get(key) {
            // Required-but-null was already reported above
            Some(_) if child.is_null() && schema.required.contains(key) => {}
            Some(prop) => visit_property(child, prop, &child_path, report),
            None => report.warning(&child_path, "Unknown property".to_string()),
        }
    }
}

fn type_matches(value: &Value, kind: &SchemaKind) -> bool {
    match kind {
        // NaN and infinities cannot be represented in a JSON number
        SchemaKind::Number { .. } => value.as_f64().is_some_and(f64::is_finite),
        SchemaKind::Integer { .. } => {
            value.is_i64()
                || value.is_u64()
                || value.as_f64().is_some_and(|n| n.is_finite() && n.fract() == 0.0)
        }
        SchemaKind::String { .. } => value.is_string(),
        SchemaKind::Boolean => value.is_boolean(),
        SchemaKind::Array { .. } => value.is_array(),
        SchemaKind::Object(_) => value.is_object(),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn check_bounds(n: f64, minimum: Option<f64>, maximum: Option<f64>, path: &str, report: &mut ValidationReport) {
    if let Some(min) = minimum {
        if n < min {
            report.error(path, format!("Value {} is less than minimum {}", n, min));
        }
    }
    if let Some(max) = maximum {
        if n > max {
            report.error(path, format!("Value {} is greater than maximum {}", n, max));
        }
    }
}

fn visit_property(value: &Value, prop: &PropertySchema, path: &str, report: &mut ValidationReport) {
    if !type_matches(value, &prop.kind) {
        report.error(
            path,
            format!("Expected {}, found {}", prop.kind.type_name(), json_type_name(value)),
        );
        return;
    }

    if let Some(allowed) = &prop.enum_values {
        if !allowed.iter().any(|candidate| values_equal(candidate, value)) {
            let listed: Vec<String> = allowed.iter().map(ToString::to_string).collect();
            report.error(path, format!("Value must be one of [{}]", listed.join(", ")));
        }
    }

    match &prop.kind {
        SchemaKind::Number { minimum, maximum } | SchemaKind::Integer { minimum, maximum } => {
            if let Some(n) = value.as_f64() {
                check_bounds(n, *minimum, *maximum, path, report);
            }
        }
        SchemaKind::String { pattern: Some(pattern) } => {
            let text = value.as_str().unwrap_or_default();
            match compiled_pattern(pattern) {
                Ok(re) if re.is_match(text) => {}
                Ok(_) => report.error(path, format!("Value does not match pattern '{}'", pattern)),
                Err(e) => report.error(path, format!("Invalid pattern '{}': {}", pattern, e)),
            }
        }
        SchemaKind::Array { items } => {
            if let Some(elements) = value.as_array() {
                for (index, element) in elements.iter().enumerate() {
                    visit_property(element, items, &format!("{}[{}]", path, index), report);
                }
            }
        }
        SchemaKind::Object(nested) => visit_object(value, nested, path, report),
        SchemaKind::String { pattern: None } | SchemaKind::Boolean => {}
    }
}

/// Remove every property flagged `sensitive`, at any depth, for safe export.
///
/// Values that the schema does not describe are kept as they are.
pub fn strip_sensitive(value: &Value, schema: &ObjectSchema) -> Value {
    match value {
        Value::Object(map) => Value::Object(strip_map(map, schema)),
        other => other.clone(),
    }
}

/// Map-level variant of [`strip_sensitive`]
pub fn strip_map(map: &Map<String, Value>, schema: &ObjectSchema) -> Map<String, Value> {
    map.iter()
        .filter_map(|(key, child)| match schema.properties.get(key) {
            Some(prop) if prop.sensitive => None,
            Some(prop) => Some((key.clone(), strip_property(child, prop))),
            None => Some((key.clone(), child.clone())),
        })
        .collect()
}

fn strip_property(value: &Value, prop: &PropertySchema) -> Value {
    match (&prop.kind, value) {
        (SchemaKind::Object(nested), Value::Object(_)) => strip_sensitive(value, nested),
        (SchemaKind::Array { items }, Value::Array(elements)) => Value::Array(
            elements
                .iter()
                .filter(|_| !items.sensitive)
                .map(|element| strip_property(element, items))
                .collect(),
        ),
        _ => value.clone(),
    }
}
