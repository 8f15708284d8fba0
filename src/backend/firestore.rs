//! Firestore REST typed-value codec.
//!
//! Firestore documents carry every value wrapped in a type tag:
//!
//! ```text
//!   {"isActive": true, "count": 3}
//!        ⇅
//!   {"fields": {"isActive": {"booleanValue": true},
//!               "count":    {"integerValue": "3"}}}
//! ```
//!
//! The rest of the firmware only sees plain JSON; this module converts at
//! the adapter boundary.

use serde_json::{Map, Value};

use crate::error::BackendError;

/// Wrap a plain JSON object as a Firestore document body.
pub fn to_document(fields: &Value) -> Result<Value, BackendError> {
    let Value::Object(map) = fields else {
        return Err(BackendError::Malformed);
    };
    let mut out = Map::new();
    out.insert("fields".into(), Value::Object(encode_map(map)));
    Ok(Value::Object(out))
}

/// Unwrap a Firestore document body into a plain JSON object.  A document
/// without a `fields` member (all fields deleted) decodes to `{}`.
pub fn from_document(doc: &Value) -> Result<Value, BackendError> {
    match doc.get("fields") {
        None => Ok(Value::Object(Map::new())),
        Some(Value::Object(fields)) => decode_map(fields).map(Value::Object),
        Some(_) => Err(BackendError::Malformed),
    }
}

/// `updateMask.fieldPaths=…` query for a patch that touches only the
/// top-level keys of `fields`.
pub fn update_mask_query(fields: &Value) -> String {
    let Value::Object(map) = fields else {
        return String::new();
    };
    map.keys()
        .map(|k| format!("updateMask.fieldPaths={k}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_map(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter().map(|(k, v)| (k.clone(), encode_value(v))).collect()
}

fn tagged(tag: &str, inner: Value) -> Value {
    let mut m = Map::new();
    m.insert(tag.into(), inner);
    Value::Object(m)
}

fn encode_value(v: &Value) -> Value {
    match v {
        Value::Null => tagged("nullValue", Value::Null),
        Value::Bool(b) => tagged("booleanValue", Value::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => tagged("integerValue", Value::String(i.to_string())),
            None => tagged("doubleValue", Value::Number(n.clone())),
        },
        Value::String(s) => tagged("stringValue", Value::String(s.clone())),
        Value::Array(items) => {
            let mut inner = Map::new();
            inner.insert(
                "values".into(),
                Value::Array(items.iter().map(encode_value).collect()),
            );
            tagged("arrayValue", Value::Object(inner))
        }
        Value::Object(map) => {
            let mut inner = Map::new();
            inner.insert("fields".into(), Value::Object(encode_map(map)));
            tagged("mapValue", Value::Object(inner))
        }
    }
}

fn decode_map(fields: &Map<String, Value>) -> Result<Map<String, Value>, BackendError> {
    fields
        .iter()
        .map(|(k, v)| decode_value(v).map(|d| (k.clone(), d)))
        .collect()
}

fn decode_value(v: &Value) -> Result<Value, BackendError> {
    let Value::Object(m) = v else {
        return Err(BackendError::Malformed);
    };
    let (tag, inner) = m.iter().next().ok_or(BackendError::Malformed)?;
    match (tag.as_str(), inner) {
        ("nullValue", _) => Ok(Value::Null),
        ("booleanValue", Value::Bool(b)) => Ok(Value::Bool(*b)),
        ("integerValue", Value::String(s)) => s
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| BackendError::Malformed),
        ("integerValue", Value::Number(n)) => Ok(Value::Number(n.clone())),
        ("doubleValue", Value::Number(n)) => Ok(Value::Number(n.clone())),
        ("stringValue" | "timestampValue" | "referenceValue", Value::String(s)) => {
            Ok(Value::String(s.clone()))
        }
        ("arrayValue", Value::Object(a)) => match a.get("values") {
            None => Ok(Value::Array(Vec::new())),
            Some(Value::Array(items)) => items
                .iter()
                .map(decode_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Some(_) => Err(BackendError::Malformed),
        },
        ("mapValue", Value::Object(mv)) => match mv.get("fields") {
            None => Ok(Value::Object(Map::new())),
            Some(Value::Object(f)) => decode_map(f).map(Value::Object),
            Some(_) => Err(BackendError::Malformed),
        },
        _ => Err(BackendError::Malformed),
    }
}
