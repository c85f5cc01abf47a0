//! Ledger-head tracking via Horizon.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use sorobanindex_core::IndexerError;

/// Source of the newest closed ledger sequence.
#[async_trait]
pub trait LedgerHeadSource: Send + Sync {
    async fn latest_ledger(&self) -> Result<u64, IndexerError>;
}

#[async_trait]
impl<T: LedgerHeadSource + ?Sized> LedgerHeadSource for std::sync::Arc<T> {
    async fn latest_ledger(&self) -> Result<u64, IndexerError> {
        (**self).latest_ledger().await
    }
}

/// Reads the head from Horizon's `/ledgers?order=desc&limit=1`.
pub struct HorizonHeadTracker {
    base_url: String,
    http: reqwest::Client,
}

impl HorizonHeadTracker {
    pub fn new(base_url: impl Into<String>) -> Result<Self, IndexerError> {
        Self::with_timeout(base_url, Duration::from_secs(15))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, IndexerError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IndexerError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn url(&self) -> String {
        format!("{}/ledgers?order=desc&limit=1", self.base_url)
    }
}

#[async_trait]
impl LedgerHeadSource for HorizonHeadTracker {
    async fn latest_ledger(&self) -> Result<u64, IndexerError> {
        let resp = self
            .http
            .get(self.url())
            .send()
            .await
            .map_err(|e| IndexerError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(IndexerError::HeadUnavailable {
                status: status.as_u16(),
                reason: body,
            });
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| IndexerError::Decode(format!("horizon ledgers response: {e}")))?;
        let head = parse_head(&body)?;
        tracing::trace!(head, "horizon head");
        Ok(head)
    }
}

/// `_embedded.records[0].sequence` of a Horizon ledgers page.
pub fn parse_head(body: &Value) -> Result<u64, IndexerError> {
    let record = body
        .pointer("/_embedded/records/0")
        .ok_or_else(|| IndexerError::HeadUnavailable {
            status: 200,
            reason: "no ledger records".into(),
        })?;

    match record.get("sequence") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| IndexerError::Decode(format!("bad ledger sequence in {record}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_numeric_sequence() {
        let body = json!({"_embedded": {"records": [{"sequence": 1234, "hash": "ab"}]}});
        assert_eq!(parse_head(&body).unwrap(), 1234);
    }

    #[test]
    fn parses_string_sequence() {
        let body = json!({"_embedded": {"records": [{"sequence": "99"}]}});
        assert_eq!(parse_head(&body).unwrap(), 99);
    }

    #[test]
    fn empty_records_is_unavailable() {
        let body = json!({"_embedded": {"records": []}});
        assert!(matches!(
            parse_head(&body),
            Err(IndexerError::HeadUnavailable { .. })
        ));
    }

    #[test]
    fn url_strips_trailing_slash() {
        let h = HorizonHeadTracker::new("https://horizon-testnet.stellar.org/").unwrap();
        assert_eq!(
            h.url(),
            "https://horizon-testnet.stellar.org/ledgers?order=desc&limit=1"
        );
    }

    #[tokio::test]
    async fn unreachable_is_transport_error() {
        let h = HorizonHeadTracker::with_timeout("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let err = h.latest_ledger().await.unwrap_err();
        assert!(matches!(err, IndexerError::Transport(_)), "{err}");
    }
}
