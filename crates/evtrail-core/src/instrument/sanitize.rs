//! Argument and result summaries safe to put in a bundle.
//!
//! Rules applied to every captured value:
//!
//! - an argument whose name contains a denylisted word (case-insensitive)
//!   is replaced by the redaction placeholder
//! - arrays and objects are replaced by a `<type, size>` descriptor, so
//!   nested secrets never leak and bundle size stays bounded
//! - long strings are truncated

use crate::canonical::{Map, Value};
use evtrail_core_types::schema::REDACTED;
use serde::Serialize;

/// Substrings that mark an argument name as sensitive
pub const SENSITIVE_NAME_PATTERNS: [&str; 9] = [
    "password",
    "secret",
    "token",
    "key",
    "auth",
    "credential",
    "private",
    "confidential",
    "api_key",
];

/// Longest string kept verbatim, in characters
pub const MAX_STRING_CHARS: usize = 256;

/// Placeholder for values serde could not represent
pub const UNSERIALIZABLE: &str = "<unserializable>";

/// Placeholder for fields the canonical codec rejected
pub const UNENCODABLE: &str = "<unencodable>";

pub fn is_sensitive_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    SENSITIVE_NAME_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Summarize an argument bundle
///
/// A struct or map yields named arguments; a tuple or sequence yields
/// positional `arg0`, `arg1`, …; unit yields an empty map.
pub fn summarize_args<A: Serialize + ?Sized>(args: &A) -> Value {
    let named = match Value::from_serialize(args) {
        Err(_) => return Value::from(UNSERIALIZABLE),
        Ok(Value::Object(map)) => map,
        Ok(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(idx, v)| (format!("arg{}", idx), v))
            .collect(),
        Ok(Value::Null) => Map::new(),
        Ok(scalar) => Map::new().with("arg0", scalar),
    };

    let sanitized: Map = named
        .into_iter()
        .map(|(name, value)| {
            let value = if is_sensitive_name(&name) {
                Value::from(REDACTED)
            } else {
                summarize_value(value)
            };
            (name, value)
        })
        .collect();
    Value::Object(sanitized)
}

/// Summarize a return value
pub fn summarize_result<T: Serialize + ?Sized>(result: &T) -> Value {
    match Value::from_serialize(result) {
        Ok(value) => summarize_value(value),
        Err(_) => Value::from(UNSERIALIZABLE),
    }
}

/// Keep scalars, describe containers, truncate long strings
pub fn summarize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(truncate(s)),
        Value::Array(items) => Value::String(format!("<array, {}>", items.len())),
        Value::Object(map) => Value::String(format!("<object, {}>", map.len())),
        scalar => scalar,
    }
}

fn truncate(s: String) -> String {
    let total = s.chars().count();
    if total <= MAX_STRING_CHARS {
        return s;
    }
    let kept: String = s.chars().take(MAX_STRING_CHARS).collect();
    format!("{}...<{} chars>", kept, total)
}
