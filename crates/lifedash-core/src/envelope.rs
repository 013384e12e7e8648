//! Response envelope normalization
//!
//! List endpoints answer with a bare array or an object wrapping the array
//! under a domain-specific key. Only the shapes a domain declares in its
//! [`EnvelopeSpec`](crate::domain::EnvelopeSpec) are accepted; anything else
//! is a parse error rather than an empty list.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::Domain;
use crate::error::{ApiError, ApiResult};

/// Unwrap a list response into its records
pub fn normalize_list(domain: Domain, body: Value) -> ApiResult<Vec<Value>> {
    let shape = domain.envelope();
    match body {
        Value::Array(items) if shape.bare_list => Ok(items),
        Value::Object(mut map) => {
            for key in shape.list_keys {
                match map.remove(*key) {
                    Some(Value::Array(items)) => return Ok(items),
                    Some(other) => {
                        return Err(ApiError::Parse(format!(
                            "{}: '{}' is {}, expected an array",
                            domain,
                            key,
                            kind(&other)
                        )))
                    }
                    None => continue,
                }
            }
            Err(unrecognized(domain, "object", shape.list_keys))
        }
        other => Err(unrecognized(domain, kind(&other), shape.list_keys)),
    }
}

/// Unwrap a single-record response (create/update answers)
pub fn normalize_record(domain: Domain, body: Value) -> ApiResult<Value> {
    let shape = domain.envelope();
    let mut map = match body {
        Value::Object(map) => map,
        other => {
            return Err(ApiError::Parse(format!(
                "{}: expected a record object, got {}",
                domain,
                kind(&other)
            )))
        }
    };

    if map.contains_key("id") {
        return Ok(Value::Object(map));
    }
    for key in shape.record_keys {
        if let Some(record @ Value::Object(_)) = map.remove(*key) {
            return Ok(record);
        }
    }
    Err(ApiError::Parse(format!(
        "{}: record has no id and no wrapper key ({})",
        domain,
        shape.record_keys.join(", ")
    )))
}

/// Normalize and decode a list response
pub fn decode_list<T: DeserializeOwned>(domain: Domain, body: Value) -> ApiResult<Vec<T>> {
    normalize_list(domain, body)?
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|e| {
                ApiError::Parse(format!("{}: record {} is malformed: {}", domain, index, e))
            })
        })
        .collect()
}

/// Normalize and decode a single-record response
pub fn decode_record<T: DeserializeOwned>(domain: Domain, body: Value) -> ApiResult<T> {
    let record = normalize_record(domain, body)?;
    serde_json::from_value(record)
        .map_err(|e| ApiError::Parse(format!("{}: record is malformed: {}", domain, e)))
}

fn unrecognized(domain: Domain, got: &str, keys: &[&str]) -> ApiError {
    ApiError::Parse(format!(
        "{}: unrecognized list envelope ({}), expected an array or one of {{{}}}",
        domain,
        got,
        keys.join(", ")
    ))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
