//! Canonical serialization of structured values.
//!
//! Implements the JSON Canonicalization Scheme (RFC 8785) over [`Value`]:
//!
//! - No insignificant whitespace
//! - Object keys sorted by UTF-16 code units, not bytes or code points
//! - Numbers in ECMAScript shortest round-trip form (`-0` becomes `0`)
//! - Minimal string escaping, everything else emitted as raw UTF-8
//!
//! ## Determinism Guarantees
//!
//! - Same value → same bytes, on every platform
//! - Maps with the same entries encode identically whatever their insertion order
//! - Arrays keep their order
//!
//! The encoder is a pure function and needs no synchronization.

mod number;
mod value;

pub use value::{Map, Value};

use crate::errors::{EvtrailError, Result};
use std::cmp::Ordering;

/// Encode a value into its canonical byte form.
///
/// ## Errors
///
/// Returns `EvtrailError::UnencodableValue` if the value contains NaN or an
/// infinity. The error names the path of the offending element.
///
/// ## Example
///
/// ```
/// use evtrail_core::canonical::{encode, Map, Value};
///
/// let value = Value::from(Map::new().with("b", 1).with("a", vec![true]));
/// assert_eq!(encode(&value).unwrap(), br#"{"a":[true],"b":1}"#.to_vec());
/// ```
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    encode_to_string(value).map(String::into_bytes)
}

/// Encode a value into its canonical text form.
///
/// ## Errors
///
/// Same as [`encode`].
pub fn encode_to_string(value: &Value) -> Result<String> {
    let mut out = String::new();
    let mut path = String::from("$");
    write_value(&mut out, value, &mut path)?;
    Ok(out)
}

/// Compare two keys by their UTF-16 code units.
///
/// Characters above U+FFFF are compared through their surrogate halves,
/// which places them before U+E000..U+FFFF.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

fn write_value(out: &mut String, value: &Value, path: &mut String) -> Result<()> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Int(i) => out.push_str(&number::format_int(*i)),
        Value::Float(f) => {
            if f.is_nan() {
                return Err(EvtrailError::unencodable(path.clone(), "NaN is not encodable"));
            }
            if f.is_infinite() {
                return Err(EvtrailError::unencodable(
                    path.clone(),
                    "Infinity is not encodable",
                ));
            }
            out.push_str(&number::format_finite_f64(*f));
        }
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                let mark = path.len();
                path.push_str(&format!("[{}]", idx));
                write_value(out, item, path)?;
                path.truncate(mark);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&str, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| compare_keys(a, b));

            out.push('{');
            for (idx, (key, item)) in entries.into_iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                let mark = path.len();
                path.push('.');
                path.push_str(key);
                write_value(out, item, path)?;
                path.truncate(mark);
            }
            out.push('}');
        }
    }
    Ok(())
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(value: &Value) -> String {
        encode_to_string(value).unwrap()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(enc(&Value::Null), "null");
        assert_eq!(enc(&Value::Bool(true)), "true");
        assert_eq!(enc(&Value::Int(-3)), "-3");
        assert_eq!(enc(&Value::Float(2.5)), "2.5");
        assert_eq!(enc(&Value::from("hi")), "\"hi\"");
    }

    #[test]
    fn test_string_escapes() {
        let s = "q\"b\\n\nt\tc\u{01}f\u{0c}/\u{2028}é";
        assert_eq!(
            enc(&Value::from(s)),
            "\"q\\\"b\\\\n\\nt\\tc\\u0001f\\f/\u{2028}é\""
        );
    }

    #[test]
    fn test_nested_structure_has_no_whitespace() {
        let value = Value::from(
            Map::new()
                .with("list", vec![Value::Int(1), Value::Null, Value::from("x")])
                .with("inner", Map::new().with("z", false)),
        );
        assert_eq!(enc(&value), r#"{"inner":{"z":false},"list":[1,null,"x"]}"#);
    }

    #[test]
    fn test_compare_keys_uses_utf16_units() {
        // U+1F600 encodes as D83D DE00, which sorts below U+FB01 (FB01)
        assert_eq!(compare_keys("\u{1F600}", "\u{FB01}"), Ordering::Less);
        // Code-point order would say the opposite
        assert!('\u{1F600}' > '\u{FB01}');
    }

    #[test]
    fn test_nan_path_is_reported() {
        let value = Value::from(
            Map::new().with("metrics", vec![Value::Float(1.0), Value::Float(f64::NAN)]),
        );
        match encode(&value).unwrap_err() {
            EvtrailError::UnencodableValue { path, .. } => assert_eq!(path, "$.metrics[1]"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_infinity_rejected() {
        assert!(encode(&Value::Float(f64::INFINITY)).is_err());
        assert!(encode(&Value::Float(f64::NEG_INFINITY)).is_err());
    }
}
