//! The fixed transform vocabulary.

use crate::errors::ValueError;
use crate::resolve::stringify;
use agentry_core_types::Transform;
use serde_json::{Number, Value};

/// Apply one transform to one value.
///
/// Non-applicable inputs pass through unchanged (the vocabulary is total);
/// only the two parse kinds can fail.
pub fn apply(value: &Value, transform: &Transform) -> Result<Value, ValueError> {
    match transform {
        Transform::Uppercase => Ok(map_string(value, |text| text.to_uppercase())),

        Transform::Lowercase => Ok(map_string(value, |text| text.to_lowercase())),

        Transform::Trim => Ok(map_string(value, |text| text.trim().to_string())),

        Transform::Split { separator } => Ok(match value {
            Value::String(text) => Value::Array(
                text.split(separator.as_str())
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            ),
            other => other.clone(),
        }),

        Transform::Join { separator } => Ok(match value {
            Value::Array(items) => Value::String(
                items
                    .iter()
                    .map(stringify)
                    .collect::<Vec<_>>()
                    .join(separator),
            ),
            other => other.clone(),
        }),

        Transform::ParseNumber => parse_number(value),

        Transform::ParseJson => match value {
            Value::String(text) => serde_json::from_str(text)
                .map_err(|err| ValueError::Parse(format!("invalid JSON: {err}"))),
            other => Err(ValueError::Parse(format!(
                "parseJson expects a string, got {}",
                type_name(other)
            ))),
        },

        Transform::ToJson => serde_json::to_string(value)
            .map(Value::String)
            .map_err(|err| ValueError::Parse(err.to_string())),

        Transform::Length => Ok(Value::Number(Number::from(length_of(value)))),

        Transform::GetProperty { path } => Ok(project(value, path)),
    }
}

fn map_string(value: &Value, op: impl Fn(&str) -> String) -> Value {
    match value {
        Value::String(text) => Value::String(op(text)),
        other => other.clone(),
    }
}

fn parse_number(value: &Value) -> Result<Value, ValueError> {
    match value {
        Value::Number(_) => Ok(value.clone()),
        Value::String(text) => {
            let trimmed = text.trim();
            if let Ok(int) = trimmed.parse::<i64>() {
                return Ok(Value::Number(Number::from(int)));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| ValueError::Parse(format!("'{trimmed}' is not a number")))
        }
        other => Err(ValueError::Parse(format!(
            "parseNumber expects a string or number, got {}",
            type_name(other)
        ))),
    }
}

fn length_of(value: &Value) -> usize {
    match value {
        Value::String(text) => text.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        _ => 0,
    }
}

/// Dotted-path projection; numeric segments index arrays. Misses yield null.
fn project(value: &Value, path: &str) -> Value {
    let mut current = value;
    for segment in path.split('.').filter(|segment| !segment.is_empty()) {
        current = match current {
            Value::Object(map) => match map.get(segment) {
                Some(next) => next,
                None => return Value::Null,
            },
            Value::Array(items) => match segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
                Some(next) => next,
                None => return Value::Null,
            },
            _ => return Value::Null,
        };
    }
    current.clone()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
