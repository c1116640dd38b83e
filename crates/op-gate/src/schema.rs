//! The static operation table.
//!
//! This table is the trust boundary: it is compiled in, never data-driven
//! from agent configs or model output. Construction of a gate can only
//! narrow it, never widen it.

use crate::sanitize::sanitize_selector;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::fmt;

/// Primitive type expected for a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Object => value.is_object(),
            ParamType::Array => value.is_array(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
        };
        write!(f, "{name}")
    }
}

/// Custom check run after the primitive type matches.
pub type Validator = fn(&Value) -> Result<(), String>;

/// Rewrites a successfully-typed value before execution.
pub type Sanitizer = fn(&Value) -> Value;

/// Schema for one declared parameter.
#[derive(Clone)]
pub struct ParamSchema {
    pub name: &'static str,
    pub ty: ParamType,
    pub required: bool,
    pub validator: Option<Validator>,
    pub sanitizer: Option<Sanitizer>,
}

impl ParamSchema {
    fn required(name: &'static str, ty: ParamType) -> Self {
        Self {
            name,
            ty,
            required: true,
            validator: None,
            sanitizer: None,
        }
    }

    fn optional(name: &'static str, ty: ParamType) -> Self {
        Self {
            name,
            ty,
            required: false,
            validator: None,
            sanitizer: None,
        }
    }

    fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = Some(sanitizer);
        self
    }

    fn selector(name: &'static str) -> Self {
        Self::required(name, ParamType::String)
            .with_validator(non_empty_string)
            .with_sanitizer(sanitize_selector_value)
    }
}

/// Schema for one whitelisted operation.
#[derive(Clone)]
pub struct OperationSchema {
    pub name: &'static str,
    pub summary: &'static str,
    pub params: Vec<ParamSchema>,
}

impl OperationSchema {
    pub fn param(&self, name: &str) -> Option<&ParamSchema> {
        self.params.iter().find(|param| param.name == name)
    }

    /// Human-readable signature used when prompting the model.
    pub fn signature(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|param| {
                let marker = if param.required { "" } else { "?" };
                format!("{}{}: {}", param.name, marker, param.ty)
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({params}) - {}", self.name, self.summary)
    }
}

fn non_empty_string(value: &Value) -> Result<(), String> {
    match value.as_str() {
        Some(text) if !text.trim().is_empty() => Ok(()),
        Some(_) => Err("must not be empty".to_string()),
        None => Err("must be a string".to_string()),
    }
}

fn css_property_name(value: &Value) -> Result<(), String> {
    let text = value.as_str().ok_or_else(|| "must be a string".to_string())?;
    if !text.is_empty()
        && text
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
    {
        Ok(())
    } else {
        Err(format!("'{text}' is not a CSS property name"))
    }
}

fn detail_level(value: &Value) -> Result<(), String> {
    match value.as_str() {
        Some("summary") | Some("full") => Ok(()),
        Some(other) => Err(format!("'{other}' is not one of: summary, full")),
        None => Err("must be a string".to_string()),
    }
}

fn sanitize_selector_value(value: &Value) -> Value {
    match value.as_str() {
        Some(text) => Value::String(sanitize_selector(text)),
        None => value.clone(),
    }
}

fn strip_control_chars(value: &Value) -> Value {
    match value.as_str() {
        Some(text) => Value::String(text.chars().filter(|ch| !ch.is_control()).collect()),
        None => value.clone(),
    }
}

/// The hand-curated whitelist. Order is presentation order in prompts.
static STATIC_TABLE: Lazy<Vec<OperationSchema>> = Lazy::new(|| {
    vec![
        OperationSchema {
            name: "remove_element",
            summary: "remove the first element matching the selector",
            params: vec![ParamSchema::selector("selector")],
        },
        OperationSchema {
            name: "click_element",
            summary: "click the first element matching the selector",
            params: vec![ParamSchema::selector("selector")],
        },
        OperationSchema {
            name: "modify_style",
            summary: "set one inline style property on an element",
            params: vec![
                ParamSchema::selector("selector"),
                ParamSchema::required("property", ParamType::String)
                    .with_validator(css_property_name),
                ParamSchema::required("value", ParamType::String)
                    .with_sanitizer(strip_control_chars),
            ],
        },
        OperationSchema {
            name: "restore_scroll",
            summary: "restore the saved scroll position",
            params: vec![],
        },
        OperationSchema {
            name: "get_element_text",
            summary: "read the text content of an element",
            params: vec![ParamSchema::selector("selector")],
        },
        OperationSchema {
            name: "scroll_to",
            summary: "scroll the first matching element into view",
            params: vec![
                ParamSchema::selector("selector"),
                ParamSchema::optional("behavior", ParamType::String),
            ],
        },
        OperationSchema {
            name: "fill_input",
            summary: "fill an input element with a value",
            params: vec![
                ParamSchema::selector("selector"),
                ParamSchema::required("value", ParamType::String)
                    .with_sanitizer(strip_control_chars),
            ],
        },
        OperationSchema {
            name: "inspect_page",
            summary: "capture a structured snapshot of the page",
            params: vec![
                ParamSchema::optional("detail_level", ParamType::String)
                    .with_validator(detail_level),
            ],
        },
    ]
});

/// The full static table.
pub fn static_schema() -> &'static [OperationSchema] {
    &STATIC_TABLE
}

/// Names in the static table, in presentation order.
pub fn static_operation_names() -> Vec<&'static str> {
    STATIC_TABLE.iter().map(|schema| schema.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn table_has_the_eight_curated_operations() {
        assert_eq!(
            static_operation_names(),
            vec![
                "remove_element",
                "click_element",
                "modify_style",
                "restore_scroll",
                "get_element_text",
                "scroll_to",
                "fill_input",
                "inspect_page",
            ]
        );
    }

    #[test]
    fn css_property_validator_rejects_injection() {
        assert!(css_property_name(&json!("background-color")).is_ok());
        assert!(css_property_name(&json!("color;}body{display:none")).is_err());
    }

    #[test]
    fn signatures_mention_optional_markers() {
        let inspect = static_schema()
            .iter()
            .find(|schema| schema.name == "inspect_page")
            .unwrap();
        assert!(inspect.signature().contains("detail_level?: string"));
    }
}
