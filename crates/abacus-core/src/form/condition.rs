//! Evaluation of field and section visibility conditions.
use serde_json::{Map, Value};

use crate::form::descriptor::{Condition, ConditionOperator};

/// Evaluate an optional condition; an absent condition is always satisfied.
pub fn is_satisfied(condition: Option<&Condition>, values: &Map<String, Value>) -> bool {
    condition.is_none_or(|c| evaluate_condition(c, values))
}

/// Evaluate a single condition against the current form values
pub fn evaluate_condition(cond: &Condition, values: &Map<String, Value>) -> bool {
    let actual = values.get(&cond.field).unwrap_or(&Value::Null);
    let expected = &cond.value;

    match cond.operator {
        ConditionOperator::Equals => values_equal(actual, expected),
        ConditionOperator::NotEquals => !values_equal(actual, expected),
        // Numeric comparisons never coerce strings
        ConditionOperator::GreaterThan => match (actual.as_f64(), expected.as_f64()) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        },
        ConditionOperator::LessThan => match (actual.as_f64(), expected.as_f64()) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        },
        ConditionOperator::Contains => eval_contains(actual, expected),
        ConditionOperator::NotContains => !eval_contains(actual, expected),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn eval_contains(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::String(s) => match expected {
            Value::String(e) => s.contains(e.as_str()),
            other => s.contains(&other.to_string()),
        },
        Value::Array(items) => items.iter().any(|item| values_equal(item, expected)),
        _ => false,
    }
}
