//! Condition evaluation.

use crate::resolve::{exact_placeholder, resolve, stringify, Scope};
use agentry_core_types::Condition;
use serde_json::Value;

/// Evaluate a condition tree against the scope. Total: every input maps to
/// a boolean. Unknown tags never reach here; they fail at deserialization.
pub fn evaluate(condition: &Condition, scope: &Scope<'_>) -> bool {
    match condition {
        Condition::Exists { var } => scope.lookup(var).is_some(),

        Condition::Equals { left, right } => resolve(left, scope) == resolve(right, scope),

        Condition::GreaterThan { left, right } => {
            match (as_number(left, scope), as_number(right, scope)) {
                (Some(lhs), Some(rhs)) => lhs > rhs,
                _ => false,
            }
        }

        Condition::LessThan { left, right } => {
            match (as_number(left, scope), as_number(right, scope)) {
                (Some(lhs), Some(rhs)) => lhs < rhs,
                _ => false,
            }
        }

        Condition::Contains { source, value } => {
            let source = resolve(source, scope);
            let needle = resolve(value, scope);
            match &source {
                Value::Array(items) => items.contains(&needle),
                Value::String(text) => text.contains(&stringify(&needle)),
                Value::Object(map) => match &needle {
                    Value::String(key) => map.contains_key(key),
                    _ => false,
                },
                _ => false,
            }
        }

        Condition::IsEmpty { value } => is_empty(value, scope),

        Condition::And(conditions) => conditions.iter().all(|cond| evaluate(cond, scope)),

        Condition::Or(conditions) => conditions.iter().any(|cond| evaluate(cond, scope)),

        Condition::Not(inner) => !evaluate(inner, scope),
    }
}

fn as_number(value: &Value, scope: &Scope<'_>) -> Option<f64> {
    resolve(value, scope).as_f64()
}

fn is_empty(value: &Value, scope: &Scope<'_>) -> bool {
    // An unbound reference counts as empty, even though the resolver would
    // pass the placeholder text through verbatim.
    if let Value::String(text) = value {
        if let Some(name) = exact_placeholder(text) {
            match scope.lookup(&name) {
                Some(bound) => return value_is_empty(bound),
                None => return true,
            }
        }
    }
    value_is_empty(&resolve(value, scope))
}

fn value_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
