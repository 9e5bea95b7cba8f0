//! Bracketed query-string folding
//!
//! The query grammar uses one level of brackets:
//! `filters[title__like]=a`, `includes[]=user`, `page=2`. This module folds
//! the decoded key/value pairs into a JSON object the schema validator can
//! consume. Repeated keys accumulate into arrays, and explicit numeric
//! indices (`filters[id__in][0]=2`) are treated the same as repetition, so
//! both spellings clients produce are accepted.

use serde_json::{Map, Value};

/// Parse a raw (still percent-encoded) query string into a JSON object
pub fn parse(raw: &str) -> Value {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw).unwrap_or_default();
    let mut root = Map::new();

    for (key, value) in pairs {
        let segments = segments(&key);
        match segments.as_slice() {
            [name] => insert(&mut root, name, Value::String(value)),
            [name, index] if is_index(index) => push(&mut root, name, Value::String(value)),
            [name, field] => {
                let nested = nested_object(&mut root, name);
                insert(nested, field, Value::String(value));
            }
            [name, field, index] if is_index(index) => {
                let nested = nested_object(&mut root, name);
                push(nested, field, Value::String(value));
            }
            // Deeper nesting is not part of the grammar
            _ => {}
        }
    }

    Value::Object(root)
}

/// Split `a[b][c]` into its bracket segments
fn segments(key: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = key;
    if let Some(open) = rest.find('[') {
        out.push(&rest[..open]);
        rest = &rest[open..];
        while let Some(close) = rest.find(']') {
            out.push(&rest[1..close]);
            rest = &rest[close + 1..];
            if !rest.starts_with('[') {
                break;
            }
        }
    } else {
        out.push(rest);
    }
    out
}

fn is_index(segment: &str) -> bool {
    segment.is_empty() || segment.bytes().all(|b| b.is_ascii_digit())
}

fn nested_object<'a>(root: &'a mut Map<String, Value>, name: &str) -> &'a mut Map<String, Value> {
    let entry = root
        .entry(name.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    // A plain key reused with brackets (`filters=x&filters[id]=5`) resets
    // to an object rather than panicking
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    match entry {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// Insert a scalar; a repeated key converts the entry into an array
fn insert(map: &mut Map<String, Value>, key: &str, value: Value) {
    match map.get_mut(key) {
        None => {
            map.insert(key.to_string(), value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}

/// Append to an array entry, creating it on first use
fn push(map: &mut Map<String, Value>, key: &str, value: Value) {
    match map.get_mut(key) {
        Some(Value::Array(items)) => items.push(value),
        _ => {
            map.insert(key.to_string(), Value::Array(vec![value]));
        }
    }
}
