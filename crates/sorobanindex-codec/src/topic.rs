//! Human topic segments → base64 XDR for server-side `getEvents` filters.
//!
//! Segments are written `kind:value` (`sym:mint`, `u32:5`, `addr:G…`,
//! `i128:-10`, `bytes:0xdead`, `str:hello`, `u64:9`). `*` passes through.
//! A segment without a recognised kind is encoded whole as a symbol.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use num_bigint::BigInt;

use crate::error::EncodingError;
use crate::scval::{ScAddress, ScValue};

/// Longest symbol the ledger accepts.
pub const MAX_SYMBOL_LEN: usize = 32;
/// Topic positions per event.
pub const MAX_TOPIC_SEGMENTS: usize = 4;

const WILDCARD: &str = "*";

/// One position of an RPC-side topic filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TopicSegment {
    Wildcard,
    /// Base64 XDR of an `ScVal`.
    Encoded(String),
}

impl TopicSegment {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Wildcard => WILDCARD,
            Self::Encoded(s) => s,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Self::Wildcard => WILDCARD.to_string(),
            Self::Encoded(s) => s,
        }
    }
}

impl fmt::Display for TopicSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a human segment into the value it denotes. `None` for the wildcard.
pub fn parse_segment(seg: &str) -> Result<Option<ScValue>, EncodingError> {
    if seg == WILDCARD {
        return Ok(None);
    }
    let value = match seg.split_once(':') {
        Some(("sym", v)) => symbol(v)?,
        Some(("str", v)) => ScValue::String(v.to_string()),
        Some(("addr", v)) => ScValue::Address(ScAddress::from_strkey(v)?),
        Some(("u32", v)) => ScValue::U32(v.parse().map_err(|e| EncodingError::value("u32", v, e))?),
        Some(("u64", v)) => ScValue::U64(v.parse().map_err(|e| EncodingError::value("u64", v, e))?),
        Some(("i128", v)) => i128_value(v)?,
        Some(("bytes", v)) => {
            let hex_str = v.strip_prefix("0x").unwrap_or(v);
            ScValue::Bytes(hex::decode(hex_str).map_err(|e| EncodingError::value("bytes", v, e))?)
        }
        _ => symbol(seg)?,
    };
    Ok(Some(value))
}

fn symbol(s: &str) -> Result<ScValue, EncodingError> {
    let valid = s.len() <= MAX_SYMBOL_LEN
        && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if !valid {
        return Err(EncodingError::InvalidSymbol(s.to_string()));
    }
    Ok(ScValue::Symbol(s.to_string()))
}

fn i128_value(v: &str) -> Result<ScValue, EncodingError> {
    // BigInt parsing gives a range error instead of a bare overflow message
    let big: BigInt = v.parse().map_err(|e| EncodingError::value("i128", v, e))?;
    let n = i128::try_from(&big).map_err(|_| EncodingError::value("i128", v, "out of range"))?;
    Ok(ScValue::I128(n))
}

/// Encode one segment for the RPC.
pub fn encode_segment(seg: &str) -> Result<TopicSegment, EncodingError> {
    match parse_segment(seg)? {
        None => Ok(TopicSegment::Wildcard),
        Some(v) => Ok(TopicSegment::Encoded(STANDARD.encode(v.to_xdr()?))),
    }
}

/// Encode a full positional topic filter, at most four segments.
pub fn encode_topics<S: AsRef<str>>(segments: &[S]) -> Result<Vec<TopicSegment>, EncodingError> {
    if segments.len() > MAX_TOPIC_SEGMENTS {
        return Err(EncodingError::TooManyTopics {
            count: segments.len(),
        });
    }
    segments.iter().map(|s| encode_segment(s.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(seg: &str) -> String {
        encode_segment(seg).unwrap().to_string()
    }

    #[test]
    fn wildcard_passes_through() {
        assert_eq!(encode_segment("*").unwrap(), TopicSegment::Wildcard);
        assert_eq!(b64("*"), "*");
    }

    #[test]
    fn bare_segment_is_symbol() {
        assert_eq!(b64("mint"), "AAAADwAAAARtaW50");
        assert_eq!(b64("sym:mint"), "AAAADwAAAARtaW50");
        assert_eq!(b64("TOKEN"), "AAAADwAAAAVUT0tFTgAAAA==");
    }

    #[test]
    fn typed_segments() {
        assert_eq!(b64("u32:5"), "AAAAAwAAAAU=");
        assert_eq!(b64("i128:-1"), "AAAACv////////////////////8=");
        assert_eq!(b64("bytes:0xDEADBEEF01"), "AAAADQAAAAXerb7vAQAAAA==");
        assert_eq!(b64("str:hello"), "AAAADgAAAAVoZWxsbwAAAA==");
    }

    #[test]
    fn address_segments() {
        assert_eq!(
            b64("addr:GAAACAQDAQCQMBYIBEFAWDANBYHRAEISCMKBKFQXDAMRUGY4DUPB7JZX"),
            "AAAAEgAAAAAAAAAAAAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8="
        );
        assert_eq!(
            b64("addr:CAAACAQDAQCQMBYIBEFAWDANBYHRAEISCMKBKFQXDAMRUGY4DUPB6N4O"),
            "AAAAEgAAAAEAAQIDBAUGBwgJCgsMDQ4PEBESExQVFhcYGRobHB0eHw=="
        );
        assert!(matches!(
            encode_segment("addr:GBAD"),
            Err(EncodingError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn non_numeric_u32_fails() {
        assert!(matches!(
            encode_segment("u32:abc"),
            Err(EncodingError::InvalidValue { kind: "u32", .. })
        ));
        assert!(encode_segment("u32:4294967296").is_err());
    }

    #[test]
    fn i128_out_of_range_fails() {
        assert!(encode_segment("i128:170141183460469231731687303715884105728").is_err());
        assert!(encode_segment("i128:-170141183460469231731687303715884105728").is_ok());
    }

    #[test]
    fn invalid_symbols_rejected() {
        assert!(matches!(
            encode_segment("has space"),
            Err(EncodingError::InvalidSymbol(_))
        ));
        assert!(encode_segment(&"a".repeat(33)).is_err());
        assert!(encode_segment(&"a".repeat(32)).is_ok());
    }

    #[test]
    fn five_topics_rejected() {
        let err = encode_topics(&["a", "b", "c", "d", "e"]).unwrap_err();
        assert_eq!(err, EncodingError::TooManyTopics { count: 5 });
        assert_eq!(encode_topics(&["mint", "*"]).unwrap().len(), 2);
    }
}
