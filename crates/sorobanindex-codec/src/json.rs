//! JSON-safe projection and topic-signature rendering of [`ScValue`].
//!
//! JSON numbers cannot hold 64-bit and wider integers exactly, so those are
//! emitted as decimal strings. Bytes become `0x…` hex, addresses their
//! strkey, and maps JSON objects in wire order.

use serde_json::{json, Map, Value};

use crate::scval::ScValue;

/// Lossless JSON projection.
pub fn to_json_safe(v: &ScValue) -> Value {
    match v {
        ScValue::Bool(b) => Value::Bool(*b),
        ScValue::Void => Value::Null,
        ScValue::Error(e) => json!({ "error": { "type": e.kind.name(), "code": e.code } }),
        ScValue::U32(n) => json!(n),
        ScValue::I32(n) => json!(n),
        ScValue::U64(n) | ScValue::Timepoint(n) | ScValue::Duration(n) => {
            Value::String(n.to_string())
        }
        ScValue::I64(n) => Value::String(n.to_string()),
        ScValue::U128(n) => Value::String(n.to_string()),
        ScValue::I128(n) => Value::String(n.to_string()),
        ScValue::U256(n) => Value::String(n.to_string()),
        ScValue::I256(n) => Value::String(n.to_string()),
        ScValue::Bytes(b) => Value::String(hex_bytes(b)),
        ScValue::String(s) | ScValue::Symbol(s) => Value::String(s.clone()),
        ScValue::Vec(items) => Value::Array(items.iter().map(to_json_safe).collect()),
        ScValue::Map(entries) => {
            let mut obj = Map::with_capacity(entries.len());
            for (k, val) in entries {
                obj.insert(signature_piece(k), to_json_safe(val));
            }
            Value::Object(obj)
        }
        ScValue::Address(a) => Value::String(a.to_strkey()),
    }
}

/// Render one topic for the colon-joined topic signature.
///
/// Strings, symbols and numbers pass through as text, bytes as hex,
/// addresses as strkeys and void as the empty string. Anything structural
/// falls back to the compact JSON of its JSON-safe projection.
pub fn signature_piece(v: &ScValue) -> String {
    match v {
        ScValue::Void => String::new(),
        ScValue::String(s) | ScValue::Symbol(s) => s.clone(),
        ScValue::U32(n) => n.to_string(),
        ScValue::I32(n) => n.to_string(),
        ScValue::U64(n) | ScValue::Timepoint(n) | ScValue::Duration(n) => n.to_string(),
        ScValue::I64(n) => n.to_string(),
        ScValue::U128(n) => n.to_string(),
        ScValue::I128(n) => n.to_string(),
        ScValue::U256(n) => n.to_string(),
        ScValue::I256(n) => n.to_string(),
        ScValue::Bytes(b) => hex_bytes(b),
        ScValue::Address(a) => a.to_strkey(),
        other => to_json_safe(other).to_string(),
    }
}

pub(crate) fn hex_bytes(b: &[u8]) -> String {
    format!("0x{}", hex::encode(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scval::{ScAddress, ScError, ScErrorType};

    #[test]
    fn wide_integers_are_strings() {
        assert_eq!(to_json_safe(&ScValue::U64(u64::MAX)), json!("18446744073709551615"));
        assert_eq!(to_json_safe(&ScValue::I128(-5)), json!("-5"));
        assert_eq!(to_json_safe(&ScValue::U32(5)), json!(5));
    }

    #[test]
    fn bytes_and_addresses() {
        assert_eq!(to_json_safe(&ScValue::Bytes(vec![0xde, 0xad])), json!("0xdead"));
        assert_eq!(to_json_safe(&ScValue::Bytes(vec![])), json!("0x"));
        let addr = ScValue::Address(ScAddress::Account([0; 32]));
        assert_eq!(
            to_json_safe(&addr),
            json!("GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF")
        );
    }

    #[test]
    fn map_keeps_wire_order() {
        let m = ScValue::Map(vec![
            (ScValue::Symbol("zeta".into()), ScValue::U32(1)),
            (ScValue::Symbol("alpha".into()), ScValue::U32(2)),
            (ScValue::U32(3), ScValue::Void),
        ]);
        let out = to_json_safe(&m);
        let keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["zeta", "alpha", "3"]);
        assert_eq!(out["3"], Value::Null);
    }

    #[test]
    fn error_value_shape() {
        let e = ScValue::Error(ScError {
            kind: ScErrorType::Contract,
            code: 3,
        });
        assert_eq!(to_json_safe(&e), json!({"error": {"type": "contract", "code": 3}}));
    }

    #[test]
    fn signature_pieces() {
        assert_eq!(signature_piece(&ScValue::Symbol("mint".into())), "mint");
        assert_eq!(signature_piece(&ScValue::U32(5)), "5");
        assert_eq!(signature_piece(&ScValue::Void), "");
        assert_eq!(signature_piece(&ScValue::Bool(true)), "true");
        assert_eq!(
            signature_piece(&ScValue::Vec(vec![ScValue::U32(1), ScValue::I64(2)])),
            r#"[1,"2"]"#
        );
    }
}
