//! Errors raised while talking to a Soroban RPC node.

use thiserror::Error;

use crate::request::JsonRpcError;

/// Failure of a single JSON-RPC exchange.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failure or non-2xx status without a JSON-RPC error body.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The node answered with a JSON-RPC `error` object.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    #[error("Timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Body was not a JSON-RPC response.
    #[error("Malformed response: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Connection-level failures; the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Timeout { .. })
    }

    /// Returns `true` if the node answered with a well-formed error.
    pub fn is_rpc_error(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(TransportError::Http("connection refused".into()).is_retryable());
        assert!(TransportError::Timeout { ms: 30_000 }.is_retryable());
        let rpc = TransportError::Rpc(JsonRpcError {
            code: -32600,
            message: "bad".into(),
            data: None,
        });
        assert!(!rpc.is_retryable());
        assert!(rpc.is_rpc_error());
    }
}
