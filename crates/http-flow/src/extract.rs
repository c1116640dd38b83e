//! Response post-processing: path extraction and field renaming.

use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Field(String),
    Index(usize),
    Wildcard,
}

/// Extract a sub-value using the simplified path syntax: `$` for the whole
/// value, dotted field access, `field[n]` indexing, `field[*]` wildcard
/// mapping over an array. Misses yield null rather than an error.
pub fn extract_path(value: &Value, path: &str) -> Value {
    let segments = parse_segments(path);
    apply_segments(value, &segments)
}

fn parse_segments(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    for chunk in path.split('.') {
        let chunk = chunk.trim();
        if chunk.is_empty() || chunk == "$" {
            continue;
        }
        let (field, brackets) = match chunk.find('[') {
            Some(open) => (&chunk[..open], &chunk[open..]),
            None => (chunk, ""),
        };
        if !field.is_empty() {
            segments.push(Segment::Field(field.to_string()));
        }
        let mut rest = brackets;
        while let Some(open) = rest.find('[') {
            let Some(close) = rest[open..].find(']') else {
                break;
            };
            let inner = &rest[open + 1..open + close];
            if inner == "*" {
                segments.push(Segment::Wildcard);
            } else if let Ok(index) = inner.parse::<usize>() {
                segments.push(Segment::Index(index));
            }
            rest = &rest[open + close + 1..];
        }
    }
    segments
}

fn apply_segments(value: &Value, segments: &[Segment]) -> Value {
    let Some((head, rest)) = segments.split_first() else {
        return value.clone();
    };
    match head {
        Segment::Field(name) => match value.get(name) {
            Some(next) => apply_segments(next, rest),
            None => Value::Null,
        },
        Segment::Index(index) => match value.get(index) {
            Some(next) => apply_segments(next, rest),
            None => Value::Null,
        },
        Segment::Wildcard => match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| apply_segments(item, rest))
                    .collect(),
            ),
            _ => Value::Null,
        },
    }
}

/// Flat rename map applied to an object, or to each object of an array.
/// Keys absent from the map pass through under their original name.
pub fn apply_field_map(value: Value, field_map: &HashMap<String, String>) -> Value {
    if field_map.is_empty() {
        return value;
    }
    match value {
        Value::Object(map) => Value::Object(rename(map, field_map)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| apply_field_map(item, field_map))
                .collect(),
        ),
        other => other,
    }
}

fn rename(map: Map<String, Value>, field_map: &HashMap<String, String>) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| {
            let key = field_map.get(&key).cloned().unwrap_or(key);
            (key, value)
        })
        .collect()
}
