//! Human-readable debug rendering: `5u32`, `"mint"sym`, `[…]`, `{k: v}`.

use std::fmt::Write;

use crate::json::hex_bytes;
use crate::scval::ScValue;

pub fn pretty(v: &ScValue) -> String {
    let mut out = String::new();
    write_pretty(&mut out, v);
    out
}

fn write_pretty(out: &mut String, v: &ScValue) {
    // writing to a String cannot fail
    let _ = match v {
        ScValue::Bool(b) => write!(out, "{b}"),
        ScValue::Void => write!(out, "void"),
        ScValue::Error(e) => write!(out, "<Error:{}:{}>", e.kind.name(), e.code),
        ScValue::U32(n) => write!(out, "{n}u32"),
        ScValue::I32(n) => write!(out, "{n}i32"),
        ScValue::U64(n) => write!(out, "{n}u64"),
        ScValue::I64(n) => write!(out, "{n}i64"),
        ScValue::Timepoint(n) => write!(out, "{n}timepoint"),
        ScValue::Duration(n) => write!(out, "{n}duration"),
        ScValue::U128(n) => write!(out, "{n}u128"),
        ScValue::I128(n) => write!(out, "{n}i128"),
        ScValue::U256(n) => write!(out, "{n}u256"),
        ScValue::I256(n) => write!(out, "{n}i256"),
        ScValue::Bytes(b) => write!(out, "{}", hex_bytes(b)),
        ScValue::String(s) => write!(out, "{s:?}str"),
        ScValue::Symbol(s) => write!(out, "{s:?}sym"),
        ScValue::Address(a) => write!(out, "{}", a.to_strkey()),
        ScValue::Vec(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_pretty(out, item);
            }
            write!(out, "]")
        }
        ScValue::Map(entries) => {
            out.push('{');
            for (i, (k, val)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_pretty(out, k);
                out.push_str(": ");
                write_pretty(out, val);
            }
            write!(out, "}}")
        }
    };
}
