//! Continuation payload codec: deterministic, canonical, round-trippable
//! encoding of contract-visible values.
//!
//! Continuation records and job payloads are content-addressed and diffed by
//! raw bytes across replicated validators, so the serialized form must be
//! byte-identical everywhere: keys sorted, `","`/`":"` separators, ASCII-only
//! output. Bytes leaves travel as `{"__bytes__": "<hex>"}`.

use crate::error::{Result, SdkError};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Marker key for byte-string leaves in the JSON-safe form.
pub const BYTES_KEY: &str = "__bytes__";

/// Map a [`Value`] onto the JSON-safe shape: bytes leaves become
/// `{"__bytes__": hex}`, everything else passes through structurally.
pub fn encode_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::Value::from(*n),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::Bytes(b) => {
            let mut marker = serde_json::Map::with_capacity(1);
            marker.insert(
                BYTES_KEY.to_owned(),
                serde_json::Value::String(hex::encode(b)),
            );
            serde_json::Value::Object(marker)
        }
        Value::Seq(items) => serde_json::Value::Array(items.iter().map(encode_value).collect()),
        Value::Map(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), encode_value(v));
            }
            serde_json::Value::Object(out)
        }
    }
}

/// Inverse of [`encode_value`]. Numbers outside i64 and floats are rejected:
/// the canonical substrate is i64-only.
pub fn decode_value(value: &serde_json::Value) -> Result<Value> {
    match value {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .ok_or_else(|| SdkError::Decode(format!("number not representable as i64: {n}"))),
        serde_json::Value::String(s) => Ok(Value::Str(s.clone())),
        serde_json::Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(decode_value(item)?);
            }
            Ok(Value::Seq(out))
        }
        serde_json::Value::Object(map) => {
            if map.len() == 1 {
                if let Some(serde_json::Value::String(hex_str)) = map.get(BYTES_KEY) {
                    let bytes = hex::decode(hex_str)
                        .map_err(|err| SdkError::Decode(format!("bad bytes marker: {err}")))?;
                    return Ok(Value::Bytes(bytes));
                }
            }
            let mut out = BTreeMap::new();
            for (k, v) in map {
                out.insert(k.clone(), decode_value(v)?);
            }
            Ok(Value::Map(out))
        }
    }
}

/// Serialize an already-encoded jsonable value in canonical form: sorted
/// keys, no whitespace, ASCII-only. Floats are rejected.
pub fn encode_json(value: &serde_json::Value) -> Result<Vec<u8>> {
    let mut out = String::new();
    write_value(&mut out, value)?;
    Ok(out.into_bytes())
}

/// Inverse parse from UTF-8 text.
pub fn decode_json(data: &[u8]) -> Result<serde_json::Value> {
    Ok(serde_json::from_slice(data)?)
}

/// Single public entry point for anything written to durable storage or
/// sent as a message payload.
pub fn encode_payload(value: &Value) -> Result<Vec<u8>> {
    encode_json(&encode_value(value))
}

pub fn decode_payload(data: &[u8]) -> Result<Value> {
    decode_value(&decode_json(data)?)
}

fn write_value(out: &mut String, value: &serde_json::Value) -> Result<()> {
    match value {
        serde_json::Value::Null => out.push_str("null"),
        serde_json::Value::Bool(true) => out.push_str("true"),
        serde_json::Value::Bool(false) => out.push_str("false"),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                let _ = write!(out, "{i}");
            } else if let Some(u) = n.as_u64() {
                let _ = write!(out, "{u}");
            } else {
                return Err(SdkError::Encode(format!(
                    "float has no canonical form: {n}"
                )));
            }
        }
        serde_json::Value::String(s) => write_string(out, s),
        serde_json::Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_value(out, item)?;
            }
            out.push(']');
        }
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (idx, key) in keys.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, &map[key.as_str()])?;
            }
            out.push('}');
        }
    }
    Ok(())
}

// Matches `json.dumps(..., ensure_ascii=True)`: the two-character escapes
// for the common controls, `\u00xx` for the rest below 0x20, raw for
// 0x20..=0x7e, `\uxxxx` (surrogate pairs beyond the BMP) above.
fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000c}' => out.push_str("\\f"),
            '\u{0020}'..='\u{007e}' => out.push(ch),
            _ => {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{:04x}", unit);
                }
            }
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Capture;

    fn payload_str(value: &Value) -> String {
        String::from_utf8(encode_payload(value).unwrap()).unwrap()
    }

    // ── Round trips ──────────────────────────────────────────────

    #[test]
    fn scalars_round_trip() {
        for v in [
            Value::Null,
            Value::Bool(true),
            Value::Bool(false),
            Value::Int(0),
            Value::Int(-42),
            Value::Int(i64::MAX),
            Value::Int(i64::MIN),
            Value::str("hello"),
            Value::str(""),
            Value::bytes(vec![0u8, 0xff, 0x10]),
            Value::bytes(Vec::new()),
        ] {
            assert_eq!(decode_payload(&encode_payload(&v).unwrap()).unwrap(), v);
        }
    }

    #[test]
    fn nested_structures_round_trip() {
        let v = Value::from(
            Capture::new()
                .with("id", Value::bytes(vec![0xab; 32]))
                .with(
                    "steps",
                    Value::Seq(vec![
                        Value::Int(1),
                        Value::str("two"),
                        Value::from(Capture::new().with("done", false)),
                    ]),
                )
                .with("note", Value::Null),
        );
        assert_eq!(decode_payload(&encode_payload(&v).unwrap()).unwrap(), v);
    }

    #[test]
    fn empty_containers_round_trip_to_empty_containers() {
        let seq = Value::Seq(vec![]);
        let map = Value::Map(Default::default());
        assert_eq!(decode_payload(&encode_payload(&seq).unwrap()).unwrap(), seq);
        assert_eq!(decode_payload(&encode_payload(&map).unwrap()).unwrap(), map);
    }

    // ── Canonical form ───────────────────────────────────────────

    #[test]
    fn key_order_is_canonical() {
        // Same logical mapping assembled in different orders.
        let a = Value::from(Capture::new().with("b", 1i64).with("a", 2i64));
        let b = Value::from(Capture::new().with("a", 2i64).with("b", 1i64));
        assert_eq!(encode_payload(&a).unwrap(), encode_payload(&b).unwrap());
        assert_eq!(payload_str(&a), r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn no_extraneous_whitespace() {
        let v = Value::from(Capture::new().with("k", Value::Seq(vec![Value::Int(1), Value::Int(2)])));
        assert_eq!(payload_str(&v), r#"{"k":[1,2]}"#);
    }

    #[test]
    fn bytes_marker_shape() {
        let v = Value::bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(payload_str(&v), r#"{"__bytes__":"deadbeef"}"#);
    }

    #[test]
    fn non_ascii_text_is_escaped() {
        assert_eq!(payload_str(&Value::str("caf\u{e9}")), r#""caf\u00e9""#);
        // Non-BMP scalar becomes a surrogate pair.
        assert_eq!(payload_str(&Value::str("\u{1d11e}")), r#""\ud834\udd1e""#);
    }

    #[test]
    fn control_characters_use_short_escapes() {
        assert_eq!(
            payload_str(&Value::str("a\nb\t\"c\"\\d\u{0001}")),
            r#""a\nb\t\"c\"\\d\u0001""#
        );
    }

    // ── Rejections ───────────────────────────────────────────────

    #[test]
    fn float_is_rejected_on_encode_json() {
        let v = serde_json::json!(1.5);
        assert!(matches!(encode_json(&v), Err(SdkError::Encode(_))));
    }

    #[test]
    fn float_is_rejected_on_decode() {
        let err = decode_payload(br#"{"x":1.5}"#).unwrap_err();
        assert!(matches!(err, SdkError::Decode(_)), "got: {err}");
    }

    #[test]
    fn u64_above_i64_is_rejected_on_decode() {
        let err = decode_payload(b"18446744073709551615").unwrap_err();
        assert!(matches!(err, SdkError::Decode(_)), "got: {err}");
    }

    #[test]
    fn bad_hex_in_bytes_marker_is_rejected() {
        let err = decode_payload(br#"{"__bytes__":"zz"}"#).unwrap_err();
        assert!(matches!(err, SdkError::Decode(_)), "got: {err}");
    }

    #[test]
    fn marker_key_with_extra_fields_stays_a_map() {
        let v = decode_payload(br#"{"__bytes__":"ff","other":1}"#).unwrap();
        let map = v.as_map().expect("expected map");
        assert_eq!(map.get("__bytes__").and_then(Value::as_str), Some("ff"));
        assert_eq!(map.get("other").and_then(Value::as_int), Some(1));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(decode_payload(b"{not json}").is_err());
    }
}
