//! `{{name}}` template resolution.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("placeholder regex"));

/// Read-only view over the variable store and the user-configuration map.
///
/// Placeholders prefixed `config.` resolve against the configuration map;
/// everything else resolves against the variables.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub vars: &'a HashMap<String, Value>,
    pub config: &'a HashMap<String, Value>,
}

impl<'a> Scope<'a> {
    pub fn new(vars: &'a HashMap<String, Value>, config: &'a HashMap<String, Value>) -> Self {
        Self { vars, config }
    }

    /// Look up a placeholder name, routing `config.`-prefixed names to the
    /// configuration map.
    pub fn lookup(&self, name: &str) -> Option<&'a Value> {
        match name.strip_prefix("config.") {
            Some(key) => self.config.get(key),
            None => self.vars.get(name),
        }
    }
}

/// Resolve templates in `value` against `scope`.
///
/// A string that is exactly one placeholder returns the raw referenced
/// value, so structured parameters pass through untouched. Mixed strings
/// substitute the stringified form of each placeholder. Unresolved
/// placeholders stay verbatim, so authors can write literal `{{...}}` text.
/// Arrays resolve element-wise, objects field-wise.
pub fn resolve(value: &Value, scope: &Scope<'_>) -> Value {
    match value {
        Value::String(text) => resolve_string(text, scope),
        Value::Array(items) => Value::Array(items.iter().map(|item| resolve(item, scope)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), resolve(item, scope)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Resolve a string that is exactly one placeholder, or `None` if the
/// string has surrounding text or the reference is unbound.
pub fn resolve_exact<'a>(text: &str, scope: &Scope<'a>) -> Option<&'a Value> {
    exact_placeholder(text).and_then(|name| scope.lookup(&name))
}

/// True when the string is a single `{{name}}` with nothing around it.
pub(crate) fn exact_placeholder(text: &str) -> Option<String> {
    let found = PLACEHOLDER.find(text)?;
    if found.start() == 0 && found.end() == text.len() {
        let caps = PLACEHOLDER.captures(text)?;
        Some(caps[1].to_string())
    } else {
        None
    }
}

fn resolve_string(text: &str, scope: &Scope<'_>) -> Value {
    if let Some(name) = exact_placeholder(text) {
        return match scope.lookup(&name) {
            Some(value) => value.clone(),
            // Unresolved references are deliberately permissive.
            None => Value::String(text.to_string()),
        };
    }

    if !PLACEHOLDER.is_match(text) {
        return Value::String(text.to_string());
    }

    let substituted = PLACEHOLDER.replace_all(text, |caps: &regex::Captures<'_>| {
        match scope.lookup(&caps[1]) {
            Some(value) => stringify(value),
            None => caps[0].to_string(),
        }
    });
    Value::String(substituted.into_owned())
}

/// Stringified form used for in-text substitution.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
