//! Recovery of operation batches from free-form model output.
//!
//! Models are asked for a strict JSON shape but routinely wrap it in prose,
//! code fences, or flattened objects. The cascade below tries progressively
//! looser readings; the first one that yields candidates wins. Candidates
//! are raw JSON values; the gate validates them afterwards.

use serde_json::{Map, Value};
use tracing::debug;

/// Keys that belong to the operation envelope rather than its parameters.
const ENVELOPE_KEYS: &[&str] = &["operation", "parameters", "reason", "priority"];

/// Recover a list of candidate operations from unconstrained text.
pub fn parse_operations_from_response(text: &str) -> Vec<Value> {
    let candidate_text = match strip_code_fence(text) {
        Some(inner) => inner,
        None => text.to_string(),
    };

    let recovered = parse_whole(&candidate_text)
        .or_else(|| parse_first_array_span(&candidate_text))
        .or_else(|| scan_object_literals(&candidate_text))
        .unwrap_or_default();

    debug!(count = recovered.len(), "operations recovered from response");
    recovered.into_iter().map(normalize_candidate).collect()
}

/// Content of the first fenced code block, if the text has one.
fn strip_code_fence(text: &str) -> Option<String> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    // the rest of the fence line is a language tag; content starts after it
    let line_end = after_fence.find('\n')?;
    let body = &after_fence[line_end + 1..];
    let end = body.find("```")?;
    Some(body[..end].to_string())
}

/// Parse the whole text as one JSON value in any of the accepted shapes:
/// a bare array, `{"operations": [...]}`, or a single `{"operation": ...}`
/// object wrapped as a one-element batch.
fn parse_whole(text: &str) -> Option<Vec<Value>> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get("operations") {
                return Some(items.clone());
            }
            if map.contains_key("operation") {
                return Some(vec![Value::Object(map)]);
            }
            None
        }
        _ => None,
    }
}

/// Greedy `[...]` span: first opening bracket to last closing bracket.
fn parse_first_array_span(text: &str) -> Option<Vec<Value>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

/// Scan for individual `{...}` object literals, using brace-depth counting
/// (string-aware) to find each object's true extent. Objects that fail to
/// parse or lack an `operation` key are skipped.
fn scan_object_literals(text: &str) -> Option<Vec<Value>> {
    let bytes = text.as_bytes();
    let mut candidates = Vec::new();
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] != b'{' {
            index += 1;
            continue;
        }

        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        let mut end = None;
        for (offset, &byte) in bytes[index..].iter().enumerate() {
            if in_string {
                if escaped {
                    escaped = false;
                } else if byte == b'\\' {
                    escaped = true;
                } else if byte == b'"' {
                    in_string = false;
                }
                continue;
            }
            match byte {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(index + offset);
                        break;
                    }
                }
                _ => {}
            }
        }

        match end {
            Some(end) => {
                let span = &text[index..=end];
                if let Ok(value) = serde_json::from_str::<Value>(span) {
                    if value.get("operation").is_some() {
                        candidates.push(value);
                    }
                }
                index = end + 1;
            }
            // unbalanced from here on; no further object can close
            None => break,
        }
    }

    if candidates.is_empty() {
        None
    } else {
        Some(candidates)
    }
}

/// Hoist flattened parameters: when a candidate has no (or an empty)
/// `parameters` object, every unrecognized top-level key becomes a
/// parameter. Accommodates model output that omits the nesting.
fn normalize_candidate(candidate: Value) -> Value {
    let Value::Object(mut map) = candidate else {
        return candidate;
    };

    let needs_hoist = match map.get("parameters") {
        None => true,
        Some(Value::Object(params)) => params.is_empty(),
        Some(_) => true,
    };

    if needs_hoist {
        let mut params = Map::new();
        let extra_keys: Vec<String> = map
            .keys()
            .filter(|key| !ENVELOPE_KEYS.contains(&key.as_str()))
            .cloned()
            .collect();
        for key in extra_keys {
            if let Some(value) = map.remove(&key) {
                params.insert(key, value);
            }
        }
        if !params.is_empty() {
            map.insert("parameters".to_string(), Value::Object(params));
        }
    }

    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(candidates: &[Value]) -> Vec<String> {
        candidates
            .iter()
            .filter_map(|candidate| candidate.get("operation"))
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn bare_array_is_recovered() {
        let text = r##"[{"operation": "click_element", "parameters": {"selector": "#a"}}]"##;
        let recovered = parse_operations_from_response(text);
        assert_eq!(names(&recovered), vec!["click_element"]);
        assert_eq!(recovered[0]["parameters"]["selector"], json!("#a"));
    }

    #[test]
    fn fenced_array_with_prose_is_recovered() {
        let text = "Sure! Here is the plan:\n```json\n[{\"operation\": \"scroll_to\", \
                    \"parameters\": {\"selector\": \".footer\"}}]\n```\nLet me know.";
        let recovered = parse_operations_from_response(text);
        assert_eq!(names(&recovered), vec!["scroll_to"]);
        assert_eq!(recovered[0]["parameters"]["selector"], json!(".footer"));
    }

    #[test]
    fn operations_field_wrapper_is_accepted() {
        let text = r#"{"operations": [{"operation": "restore_scroll"}]}"#;
        assert_eq!(
            names(&parse_operations_from_response(text)),
            vec!["restore_scroll"]
        );
    }

    #[test]
    fn single_object_is_wrapped_into_a_batch() {
        let text = r#"{"operation": "inspect_page", "parameters": {}}"#;
        assert_eq!(
            names(&parse_operations_from_response(text)),
            vec!["inspect_page"]
        );
    }

    #[test]
    fn flattened_keys_become_parameters() {
        let text = r##"{"operation": "fill_input", "selector": "#q", "value": "tea", "reason": "search"}"##;
        let recovered = parse_operations_from_response(text);
        assert_eq!(recovered.len(), 1);
        assert_eq!(recovered[0]["parameters"]["selector"], json!("#q"));
        assert_eq!(recovered[0]["parameters"]["value"], json!("tea"));
        // envelope keys stay where they are
        assert_eq!(recovered[0]["reason"], json!("search"));
        assert!(recovered[0]["parameters"].get("reason").is_none());
    }

    #[test]
    fn array_span_inside_prose_is_found() {
        let text = "I would do this: [{\"operation\": \"click_element\", \
                    \"parameters\": {\"selector\": \"#next\"}}] and that should work.";
        assert_eq!(
            names(&parse_operations_from_response(text)),
            vec!["click_element"]
        );
    }

    #[test]
    fn object_scan_skips_unparseable_literals() {
        let text = "First {\"operation\": \"click_element\", \"selector\": \"#a\"} then \
                    {broken json} and {\"operation\": \"restore_scroll\"} done. Also \
                    {\"note\": \"not an operation\"}";
        let recovered = parse_operations_from_response(text);
        assert_eq!(names(&recovered), vec!["click_element", "restore_scroll"]);
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_the_scan() {
        let text = r##"Try {"operation": "fill_input", "selector": "#q", "value": "a{b}c"} now"##;
        let recovered = parse_operations_from_response(text);
        assert_eq!(recovered[0]["parameters"]["value"], json!("a{b}c"));
    }

    #[test]
    fn garbage_yields_an_empty_batch() {
        assert!(parse_operations_from_response("no operations here").is_empty());
        assert!(parse_operations_from_response("").is_empty());
    }
}
