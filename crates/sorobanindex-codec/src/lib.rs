//! sorobanindex-codec: Soroban `ScVal` codec.
//!
//! Decodes base64 XDR event topics and values into [`ScValue`], projects
//! them into lossless JSON ([`to_json_safe`]), renders topic-signature
//! pieces and a debug form, and encodes human topic segments for
//! server-side filters.
//!
//! # Example
//!
//! ```
//! use sorobanindex_codec::{decode_segment, encode_segment};
//!
//! let seg = encode_segment("mint").unwrap();
//! let decoded = decode_segment(seg.as_str());
//! assert_eq!(decoded.piece, "mint");
//! ```

pub mod error;
pub mod json;
pub mod pretty;
pub mod scval;
pub mod strkey;
pub mod topic;
pub mod xdr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};

pub use error::{DecodeError, EncodingError, StrkeyError};
pub use json::{signature_piece, to_json_safe};
pub use pretty::pretty;
pub use scval::{ScAddress, ScError, ScErrorType, ScValue};
pub use topic::{encode_segment, encode_topics, parse_segment, TopicSegment};

/// Signature piece used for a segment that failed to decode.
pub const UNDECODABLE_PIECE: &str = "<undecodable>";

/// Decode one base64 XDR `ScVal`.
pub fn decode_base64(b64: &str) -> Result<ScValue, DecodeError> {
    let bytes = STANDARD
        .decode(b64.trim())
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    ScValue::from_xdr(&bytes)
}

/// A topic or value segment after decoding, never failing.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSegment {
    /// JSON-safe value, or `{"undecodable": "<base64>"}`.
    pub json: Value,
    /// Signature rendering, or `<undecodable>`.
    pub piece: String,
    /// Why decoding failed, if it did.
    pub error: Option<DecodeError>,
}

impl DecodedSegment {
    pub fn is_undecodable(&self) -> bool {
        self.error.is_some()
    }
}

/// Decode a segment, substituting a placeholder on failure.
pub fn decode_segment(b64: &str) -> DecodedSegment {
    match decode_base64(b64) {
        Ok(v) => DecodedSegment {
            json: to_json_safe(&v),
            piece: signature_piece(&v),
            error: None,
        },
        Err(e) => DecodedSegment {
            json: json!({ "undecodable": b64 }),
            piece: UNDECODABLE_PIECE.to_string(),
            error: Some(e),
        },
    }
}

/// Debug rendering of a base64 segment, `<undecodable: …>` on failure.
pub fn pretty_base64(b64: &str) -> String {
    match decode_base64(b64) {
        Ok(v) => pretty(&v),
        Err(e) => format!("<undecodable: {e}>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_segment_success() {
        let seg = decode_segment("AAAAAwAAAAU=");
        assert_eq!(seg.json, json!(5));
        assert_eq!(seg.piece, "5");
        assert!(!seg.is_undecodable());
    }

    #[test]
    fn decode_segment_placeholder() {
        let seg = decode_segment("AAAA");
        assert!(seg.is_undecodable());
        assert_eq!(seg.piece, UNDECODABLE_PIECE);
        assert_eq!(seg.json, json!({"undecodable": "AAAA"}));
    }

    #[test]
    fn bad_base64_is_decode_error() {
        assert!(matches!(decode_base64("%%%"), Err(DecodeError::Base64(_))));
    }

    #[test]
    fn pretty_base64_renders() {
        assert_eq!(pretty_base64("AAAADwAAAARtaW50"), r#""mint"sym"#);
        assert!(pretty_base64("AAAA").starts_with("<undecodable"));
    }
}
