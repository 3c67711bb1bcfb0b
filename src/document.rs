//! Typed accessors over loosely-typed resource documents
//!
//! ExternalSecrets are handled as `serde_json::Value` trees. The helpers here
//! walk a field path and report one of three outcomes: found (with a typed
//! reference), absent, or a [`ShapeError`] when a field on the path has the
//! wrong type. Keeping that distinction in one place lets callers skip
//! malformed entries without scattering type checks.

use serde_json::{Map, Value};
use thiserror::Error;

/// A field on the requested path exists but has an unexpected type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path} accessor error: expected {expected}, found {found}")]
pub struct ShapeError {
    /// Dotted path of the offending field
    pub path: String,
    /// Type the accessor expected
    pub expected: &'static str,
    /// Type actually present
    pub found: &'static str,
}

/// Lookup outcome: `Ok(Some)` found, `Ok(None)` absent, `Err` wrong shape
pub type Lookup<'a, T> = Result<Option<&'a T>, ShapeError>;

/// Short name for the JSON type of a value, used in diagnostics
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

fn shape_error(fields: &[&str], expected: &'static str, found: &Value) -> ShapeError {
    ShapeError {
        path: if fields.is_empty() {
            ".".to_string()
        } else {
            format!(".{}", fields.join("."))
        },
        expected,
        found: kind_of(found),
    }
}

/// Walk `fields` from `root`, requiring every intermediate value to be a map.
pub fn nested_field<'a>(root: &'a Value, fields: &[&str]) -> Lookup<'a, Value> {
    let mut current = root;
    for (depth, field) in fields.iter().enumerate() {
        let map = current
            .as_object()
            .ok_or_else(|| shape_error(&fields[..depth], "map", current))?;
        match map.get(*field) {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// Look up a map at `fields`
pub fn nested_map<'a>(root: &'a Value, fields: &[&str]) -> Lookup<'a, Map<String, Value>> {
    match nested_field(root, fields)? {
        None => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(shape_error(fields, "map", other)),
    }
}

/// Look up a sequence at `fields`
pub fn nested_slice<'a>(root: &'a Value, fields: &[&str]) -> Lookup<'a, Vec<Value>> {
    match nested_field(root, fields)? {
        None => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(other) => Err(shape_error(fields, "array", other)),
    }
}

/// Look up a string at `fields`
pub fn nested_str<'a>(root: &'a Value, fields: &[&str]) -> Result<Option<&'a str>, ShapeError> {
    match nested_field(root, fields)? {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(shape_error(fields, "string", other)),
    }
}
