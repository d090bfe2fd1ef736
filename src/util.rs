//! Name normalization and tolerant JSON helpers

use heck::ToSnakeCase;
use serde_json::Value;

/// Convert a camel case name to an underscore name.
///
/// `HttpRequest`, `httpRequest` and `HTTPRequest` all become `http_request`;
/// leading and trailing underscores are kept.
pub fn camel_to_underscore(name: &str) -> String {
    // heck drops edge separators, so they are carried over as written
    let edge = |c: char| c == '_' || c == '-';
    let core = name.trim_matches(edge);
    if core.is_empty() {
        return name.to_string();
    }
    let leading = &name[..name.len() - name.trim_start_matches(edge).len()];
    let trailing = &name[name.trim_end_matches(edge).len()..];
    format!("{leading}{}{trailing}", core.to_snake_case())
}

/// Normalize a parameter name into its CLI form.
///
/// Case is unified, a single trailing underscore (the reserved-word escape,
/// as in `type_`) is dropped and underscores become dashes.
pub fn normalize_name(name: &str) -> String {
    let mut name = camel_to_underscore(name);
    if name.ends_with('_') && !name.ends_with("__") {
        name.pop();
    }
    name.replace('_', "-")
}

/// Load a JSON-encoded string.
///
/// An empty string is `null`. When `tolerant` is set, a string that isn't
/// valid JSON is returned as a JSON string instead of failing.
pub fn load_json_value(string: &str, tolerant: bool) -> Result<Value, serde_json::Error> {
    if string.is_empty() {
        return Ok(Value::Null);
    }
    match serde_json::from_str(string) {
        Ok(value) => Ok(value),
        Err(_) if tolerant => Ok(Value::String(string.to_string())),
        Err(e) => Err(e),
    }
}

/// Tolerant JSON decode that never fails
pub fn decode_tolerant(string: &str) -> Value {
    load_json_value(string, true).unwrap_or_else(|_| Value::String(string.to_string()))
}

/// Load a `name=value` item where the value is JSON-encoded
pub fn load_json_item(string: &str) -> Result<(String, Value), String> {
    match string.split_once('=') {
        Some((name, value)) => Ok((name.to_string(), decode_tolerant(value))),
        None => Err(format!(
            "Bad format for item; expected: name=<value>; got: {string}"
        )),
    }
}
