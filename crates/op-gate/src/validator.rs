//! Operation validation against the effective whitelist.

use crate::schema::{static_schema, OperationSchema};
use agentry_core_types::SafeOperation;
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a candidate operation was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OperationIssue {
    #[error("operation must be a JSON object")]
    NotAnObject,

    #[error("operation is missing its name")]
    MissingName,

    #[error("operation '{name}' is not allowed; allowed operations: {allowed}")]
    NotWhitelisted { name: String, allowed: String },

    #[error("operation '{operation}' is missing required parameter '{name}'")]
    MissingParameter { operation: String, name: String },

    #[error("parameter '{name}' of '{operation}' must be a {expected}")]
    TypeMismatch {
        operation: String,
        name: String,
        expected: String,
    },

    #[error("parameter '{name}' of '{operation}' is invalid: {reason}")]
    InvalidValue {
        operation: String,
        name: String,
        reason: String,
    },
}

/// One rejected batch entry, with its original position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidOperation {
    pub index: usize,
    pub operation: Option<String>,
    pub issue: OperationIssue,
}

/// Result of validating a batch.
///
/// `valid` is sorted ascending by priority (absent priority sorts last);
/// ties keep their original relative order. Callers may execute the valid
/// subset even when `invalid` is non-empty.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub valid: Vec<SafeOperation>,
    pub invalid: Vec<InvalidOperation>,
}

impl BatchOutcome {
    pub fn is_valid(&self) -> bool {
        self.invalid.is_empty()
    }
}

/// The effective whitelist: a (possibly narrowed) view of the static table.
#[derive(Debug, Clone)]
pub struct OperationGate {
    allowed: Vec<&'static str>,
}

impl Default for OperationGate {
    fn default() -> Self {
        Self::new(None)
    }
}

impl OperationGate {
    /// Build a gate, optionally narrowed to a subset of operation names.
    ///
    /// Names outside the static table are silently dropped: the effective
    /// whitelist is always a subset of the static table, never a superset.
    pub fn new(subset: Option<&[String]>) -> Self {
        let allowed = match subset {
            None => static_schema().iter().map(|schema| schema.name).collect(),
            Some(names) => {
                let requested: HashSet<&str> =
                    names.iter().map(|name| name.as_str()).collect();
                let allowed: Vec<&'static str> = static_schema()
                    .iter()
                    .map(|schema| schema.name)
                    .filter(|name| requested.contains(name))
                    .collect();
                let dropped: Vec<&str> = requested
                    .iter()
                    .copied()
                    .filter(|name| !allowed.iter().any(|kept| kept == name))
                    .collect();
                if !dropped.is_empty() {
                    warn!(?dropped, "requested operations not in the static table");
                }
                allowed
            }
        };
        Self { allowed }
    }

    /// Allowed operation names, in static-table order.
    pub fn allowed_names(&self) -> &[&'static str] {
        &self.allowed
    }

    /// Schemas for the allowed operations, in static-table order.
    pub fn allowed_schemas(&self) -> Vec<&'static OperationSchema> {
        static_schema()
            .iter()
            .filter(|schema| self.allowed.contains(&schema.name))
            .collect()
    }

    fn schema_for(&self, name: &str) -> Option<&'static OperationSchema> {
        if !self.allowed.iter().any(|allowed| *allowed == name) {
            return None;
        }
        static_schema().iter().find(|schema| schema.name == name)
    }

    /// Validate and sanitize a single candidate operation.
    ///
    /// On success returns a new operation object: declared parameters only
    /// (unknown parameters are dropped, not errored), each typed-checked,
    /// custom-validated, and passed through its sanitizer.
    pub fn validate_operation(&self, candidate: &Value) -> Result<SafeOperation, OperationIssue> {
        let object = candidate.as_object().ok_or(OperationIssue::NotAnObject)?;

        let name = object
            .get("operation")
            .and_then(Value::as_str)
            .ok_or(OperationIssue::MissingName)?;

        let schema = self
            .schema_for(name)
            .ok_or_else(|| OperationIssue::NotWhitelisted {
                name: name.to_string(),
                allowed: self.allowed.join(", "),
            })?;

        let supplied = object
            .get("parameters")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let mut sanitized = Map::new();
        for param in &schema.params {
            let value = match supplied.get(param.name) {
                Some(value) => value,
                None if param.required => {
                    return Err(OperationIssue::MissingParameter {
                        operation: name.to_string(),
                        name: param.name.to_string(),
                    })
                }
                None => continue,
            };

            if !param.ty.matches(value) {
                return Err(OperationIssue::TypeMismatch {
                    operation: name.to_string(),
                    name: param.name.to_string(),
                    expected: param.ty.to_string(),
                });
            }

            if let Some(validator) = param.validator {
                validator(value).map_err(|reason| OperationIssue::InvalidValue {
                    operation: name.to_string(),
                    name: param.name.to_string(),
                    reason,
                })?;
            }

            // Sanitizers run only on successfully-typed, validated values.
            let value = match param.sanitizer {
                Some(sanitizer) => sanitizer(value),
                None => value.clone(),
            };
            sanitized.insert(param.name.to_string(), value);
        }

        Ok(SafeOperation {
            operation: name.to_string(),
            parameters: sanitized,
            reason: object
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            priority: object.get("priority").and_then(Value::as_u64).map(|p| p as u32),
        })
    }

    /// Validate every candidate independently and order the survivors.
    pub fn validate_operations(&self, batch: &[Value]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for (index, candidate) in batch.iter().enumerate() {
            match self.validate_operation(candidate) {
                Ok(operation) => outcome.valid.push(operation),
                Err(issue) => {
                    debug!(index, %issue, "operation rejected");
                    outcome.invalid.push(InvalidOperation {
                        index,
                        operation: candidate
                            .get("operation")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        issue,
                    });
                }
            }
        }
        // Stable sort keeps original relative order on priority ties.
        outcome
            .valid
            .sort_by_key(|operation| operation.effective_priority());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_operation_enumerates_the_allowed_set() {
        let gate = OperationGate::default();
        let issue = gate
            .validate_operation(&json!({
                "operation": "drop_database",
                "parameters": { "selector": "#x" }
            }))
            .unwrap_err();
        match issue {
            OperationIssue::NotWhitelisted { name, allowed } => {
                assert_eq!(name, "drop_database");
                for expected in ["click_element", "inspect_page", "fill_input"] {
                    assert!(allowed.contains(expected), "missing {expected} in {allowed}");
                }
            }
            other => panic!("expected NotWhitelisted, got {other:?}"),
        }
    }

    #[test]
    fn non_object_input_is_rejected() {
        let gate = OperationGate::default();
        assert_eq!(
            gate.validate_operation(&json!("click_element")),
            Err(OperationIssue::NotAnObject)
        );
    }

    #[test]
    fn subset_outside_static_table_is_dropped() {
        let gate = OperationGate::new(Some(&[
            "click_element".to_string(),
            "format_disk".to_string(),
        ]));
        assert_eq!(gate.allowed_names(), &["click_element"]);
        assert!(gate
            .validate_operation(&json!({
                "operation": "inspect_page",
                "parameters": {}
            }))
            .is_err());
    }

    #[test]
    fn unknown_parameters_are_dropped_not_errored() {
        let gate = OperationGate::default();
        let operation = gate
            .validate_operation(&json!({
                "operation": "click_element",
                "parameters": { "selector": "#go", "turbo": true }
            }))
            .unwrap();
        assert!(operation.parameters.contains_key("selector"));
        assert!(!operation.parameters.contains_key("turbo"));
    }

    #[test]
    fn selector_parameters_are_sanitized() {
        let gate = OperationGate::default();
        let operation = gate
            .validate_operation(&json!({
                "operation": "click_element",
                "parameters": { "selector": "a[href='javascript:alert(1)']" }
            }))
            .unwrap();
        let selector = operation.parameters["selector"].as_str().unwrap();
        assert!(!selector.contains("javascript:"));
    }

    #[test]
    fn missing_required_parameter_is_reported() {
        let gate = OperationGate::default();
        assert!(matches!(
            gate.validate_operation(&json!({
                "operation": "fill_input",
                "parameters": { "selector": "#q" }
            })),
            Err(OperationIssue::MissingParameter { .. })
        ));
    }

    #[test]
    fn type_mismatch_is_reported() {
        let gate = OperationGate::default();
        assert!(matches!(
            gate.validate_operation(&json!({
                "operation": "click_element",
                "parameters": { "selector": 42 }
            })),
            Err(OperationIssue::TypeMismatch { .. })
        ));
    }

    #[test]
    fn batch_orders_by_priority_with_default_last() {
        let gate = OperationGate::default();
        let batch = vec![
            json!({ "operation": "click_element", "parameters": { "selector": "#a" }, "priority": 3 }),
            json!({ "operation": "click_element", "parameters": { "selector": "#b" }, "priority": 1 }),
            json!({ "operation": "click_element", "parameters": { "selector": "#c" }, "priority": 2 }),
            json!({ "operation": "click_element", "parameters": { "selector": "#d" } }),
        ];
        let outcome = gate.validate_operations(&batch);
        assert!(outcome.is_valid());
        let priorities: Vec<u32> = outcome
            .valid
            .iter()
            .map(|operation| operation.effective_priority())
            .collect();
        assert_eq!(priorities, vec![1, 2, 3, 999]);
    }

    #[test]
    fn batch_keeps_valid_subset_alongside_rejections() {
        let gate = OperationGate::default();
        let batch = vec![
            json!({ "operation": "click_element", "parameters": { "selector": "#ok" } }),
            json!({ "operation": "nuke_page", "parameters": {} }),
        ];
        let outcome = gate.validate_operations(&batch);
        assert!(!outcome.is_valid());
        assert_eq!(outcome.valid.len(), 1);
        assert_eq!(outcome.invalid.len(), 1);
        assert_eq!(outcome.invalid[0].index, 1);
        assert_eq!(outcome.invalid[0].operation.as_deref(), Some("nuke_page"));
    }
}
