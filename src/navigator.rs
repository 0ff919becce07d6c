//! Typed accessors over untyped HAL/JSON responses.
//!
//! Paths are dot-separated object keys, e.g. `_embedded.searchResult._embedded.objects`.
//! A missing key or a value of the wrong JSON type is reported as a
//! [`NavigationError`]; nothing here panics on unexpected input.

use serde_json::Value;

use crate::error::NavigationError;

/// Follow `path` from `root` and return the addressed value.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Result<&'a Value, NavigationError> {
    let mut current = root;
    for segment in path.split('.') {
        let object = current.as_object().ok_or_else(|| NavigationError::Mismatch {
            path: path.to_string(),
            expected: "object",
            found: type_name(current),
        })?;
        current = object.get(segment).ok_or_else(|| NavigationError::Missing {
            path: path.to_string(),
            segment: segment.to_string(),
        })?;
    }
    Ok(current)
}

pub fn str_at<'a>(root: &'a Value, path: &str) -> Result<&'a str, NavigationError> {
    let value = lookup(root, path)?;
    value.as_str().ok_or_else(|| mismatch(path, "string", value))
}

/// Non-negative integer at `path`. Counts such as `page.totalElements` go through here.
pub fn u64_at(root: &Value, path: &str) -> Result<u64, NavigationError> {
    let value = lookup(root, path)?;
    value
        .as_u64()
        .ok_or_else(|| mismatch(path, "non-negative integer", value))
}

pub fn array_at<'a>(root: &'a Value, path: &str) -> Result<&'a [Value], NavigationError> {
    let value = lookup(root, path)?;
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| mismatch(path, "array", value))
}

/// Like [`array_at`], but an absent path reads as an empty list.
///
/// Listing endpoints drop `_embedded` entirely when a page is past the end,
/// which is a normal "nothing here" answer rather than a broken contract.
/// A value of the wrong type is still an error.
pub fn optional_array_at<'a>(root: &'a Value, path: &str) -> Result<&'a [Value], NavigationError> {
    match array_at(root, path) {
        Err(NavigationError::Missing { .. }) => Ok(&[]),
        other => other,
    }
}

fn mismatch(path: &str, expected: &'static str, found: &Value) -> NavigationError {
    NavigationError::Mismatch {
        path: path.to_string(),
        expected,
        found: type_name(found),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
