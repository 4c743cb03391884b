//! Canonical JSON encoding.
//!
//! Signatures are computed over the canonical encoding of a document's
//! `signed` portion, never over default `serde_json` output. The encoding is
//! the OLPC-style canonical form used by metadata signers:
//! - object keys sorted by their UTF-8 bytes
//! - no insignificant whitespace
//! - strings escape only `"` and `\`; all other bytes are emitted verbatim
//! - integers only (floating point numbers are rejected)
//!
//! This module performs no I/O.

use serde::Serialize;
use serde_json::Value;

use crate::errors::{HashbinError, HashbinResult};

/// Encode a JSON value into canonical bytes.
pub fn to_canonical_bytes(value: &Value) -> HashbinResult<Vec<u8>> {
    let mut out = Vec::new();
    write_value(&mut out, value)?;
    Ok(out)
}

/// Serialize any value through serde and return its canonical bytes.
pub fn canonical_bytes_of<T: Serialize>(value: &T) -> HashbinResult<Vec<u8>> {
    let v = serde_json::to_value(value)
        .map_err(|e| HashbinError::serialization(format!("failed to serialize: {e}")))?;
    to_canonical_bytes(&v)
}

fn write_value(out: &mut Vec<u8>, value: &Value) -> HashbinResult<()> {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.extend_from_slice(i.to_string().as_bytes());
            } else if let Some(u) = n.as_u64() {
                out.extend_from_slice(u.to_string().as_bytes());
            } else {
                return Err(HashbinError::serialization(format!(
                    "canonical json does not allow floats: {n}"
                )));
            }
        }
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(out, item)?;
            }
            out.push(b']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push(b'{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_string(out, k);
                out.push(b':');
                write_value(out, v)?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    out.push(b'"');
    for b in s.bytes() {
        if b == b'"' || b == b'\\' {
            out.push(b'\\');
        }
        out.push(b);
    }
    out.push(b'"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_sorted_and_compact() {
        let v = json!({"b": 1, "a": [true, null, "x"], "c": {"z": 0, "y": -2}});
        let bytes = to_canonical_bytes(&v).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"a":[true,null,"x"],"b":1,"c":{"y":-2,"z":0}}"#
        );
    }

    #[test]
    fn only_quote_and_backslash_escaped() {
        let v = json!({"k": "a\"b\\c\nd"});
        let bytes = to_canonical_bytes(&v).unwrap();
        assert_eq!(bytes, b"{\"k\":\"a\\\"b\\\\c\nd\"}".to_vec());
    }

    #[test]
    fn floats_rejected() {
        let v = json!({"f": 1.5});
        let err = to_canonical_bytes(&v).unwrap_err();
        assert!(err.to_string().contains("floats"));
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let a = json!({"x": 1, "y": 2});
        let b = json!({"y": 2, "x": 1});
        assert_eq!(to_canonical_bytes(&a).unwrap(), to_canonical_bytes(&b).unwrap());
    }
}
