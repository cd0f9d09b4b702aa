//! Decoding of loosely-shaped request bodies and stored values.

use serde::Deserialize;
use serde_json::Value;

/// Shapes accepted where a list is expected.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListPayload {
    List(Vec<Value>),
    Wrapped { items: Vec<Value> },
}

/// Normalize to a list: a raw array, an object with an array `items`
/// field, or otherwise an empty list.
pub fn normalize_array_payload(value: Value) -> Vec<Value> {
    match serde_json::from_value::<ListPayload>(value) {
        Ok(ListPayload::List(items)) | Ok(ListPayload::Wrapped { items }) => items,
        Err(_) => Vec::new(),
    }
}

/// String bodies are parsed as JSON when they can be; anything else passes
/// through unchanged.
pub fn parse_body(body: Option<Value>) -> Value {
    match body {
        None => Value::Null,
        Some(Value::String(raw)) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        Some(other) => other,
    }
}
