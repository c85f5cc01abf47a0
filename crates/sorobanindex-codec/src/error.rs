//! Error types for the ScVal codec and topic encoder.

use thiserror::Error;

/// Errors that can occur while decoding a single XDR segment.
///
/// These never abort an event: the fetch layer replaces the failed segment
/// with a placeholder and records the reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Invalid base64: {0}")]
    Base64(String),

    #[error("Unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("Invalid {what} discriminant {value}")]
    InvalidDiscriminant { what: &'static str, value: i64 },

    #[error("Non-zero XDR padding")]
    NonZeroPadding,

    #[error("Length {len} exceeds limit {limit}")]
    LengthExceeded { len: usize, limit: usize },

    #[error("Nesting deeper than {limit} levels")]
    DepthExceeded { limit: usize },

    #[error("Unsupported ScVal type {0}")]
    Unsupported(&'static str),

    #[error("{count} trailing bytes after value")]
    TrailingBytes { count: usize },
}

/// Errors raised when a human topic segment cannot be encoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("Invalid {kind} value '{value}': {reason}")]
    InvalidValue {
        kind: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid symbol '{0}': at most 32 characters from [A-Za-z0-9_]")]
    InvalidSymbol(String),

    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Topic filter has {count} segments, at most 4 allowed")]
    TooManyTopics { count: usize },

    #[error("{0} is not representable in XDR")]
    Unrepresentable(String),
}

impl EncodingError {
    pub(crate) fn value(kind: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::InvalidValue {
            kind,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Errors from strkey parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrkeyError {
    #[error("Invalid base32 character '{0}'")]
    InvalidCharacter(char),

    #[error("Invalid length {0}")]
    InvalidLength(usize),

    #[error("Checksum mismatch")]
    Checksum,

    #[error("Unknown version byte {0:#04x}")]
    UnknownVersion(u8),
}
