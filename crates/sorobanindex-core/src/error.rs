//! Error types for the sorobanindex pipeline.

use thiserror::Error;

/// Errors that can occur during ingestion.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// Well-formed error response from the event RPC.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Network / HTTP failure reaching a remote service.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Ledger head unavailable (status {status}): {reason}")]
    HeadUnavailable { status: u16, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Handler error in '{handler}': {reason}")]
    Handler { handler: String, reason: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Indexer aborted: {reason}")]
    Aborted { reason: String },

    #[error("{0}")]
    Other(String),
}

impl IndexerError {
    /// Returns `true` if the scheduler should back off and retry the same range.
    ///
    /// Configuration and encoding errors are raised at startup and never
    /// go away by retrying.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            Self::Config(_) | Self::Encoding(_) | Self::Aborted { .. }
        )
    }

    pub fn handler(handler: impl Into<String>, reason: impl ToString) -> Self {
        Self::Handler {
            handler: handler.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(IndexerError::Transport("connection reset".into()).is_transient());
        assert!(IndexerError::HeadUnavailable { status: 503, reason: "busy".into() }.is_transient());
        assert!(IndexerError::Storage("deadlock".into()).is_transient());
        assert!(!IndexerError::Config("chunk_size must be > 0".into()).is_transient());
        assert!(!IndexerError::Encoding("bad u32".into()).is_transient());
    }

    #[test]
    fn handler_error_display() {
        let e = IndexerError::handler("mint", "row exists");
        assert_eq!(e.to_string(), "Handler error in 'mint': row exists");
    }
}
