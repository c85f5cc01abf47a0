//! Persisted event records and the idempotent store trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IndexerError;
use crate::types::DecodedEvent;

/// Default page size for [`EventQuery`].
pub const DEFAULT_QUERY_LIMIT: u32 = 100;
/// Hard cap on [`EventQuery::limit`].
pub const MAX_QUERY_LIMIT: u32 = 1_000;

/// Composite identity of a persisted event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub tx_hash: String,
    pub contract_id: String,
    pub ledger: u64,
    pub topic_signature: String,
}

/// One durable row per ingested event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub network: String,
    pub tx_hash: String,
    pub contract_id: String,
    pub ledger: u64,
    pub topic_signature: String,
    /// Decoded topics as a JSON array.
    pub topics: serde_json::Value,
    /// Decoded event value.
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl EventRecord {
    pub fn from_event(network: &str, event: &DecodedEvent) -> Self {
        Self {
            network: network.to_string(),
            tx_hash: event.tx_hash.clone(),
            contract_id: event.contract_id.clone(),
            ledger: event.ledger,
            topic_signature: event.topic_signature.clone(),
            topics: serde_json::Value::Array(event.topics.clone()),
            data: event.value.clone(),
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> EventKey {
        EventKey {
            tx_hash: self.tx_hash.clone(),
            contract_id: self.contract_id.clone(),
            ledger: self.ledger,
            topic_signature: self.topic_signature.clone(),
        }
    }
}

/// A record as read back from a store, with its insertion id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: i64,
    #[serde(flatten)]
    pub record: EventRecord,
}

/// Read-side filter over persisted events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventQuery {
    /// Exact contract id.
    pub contract_id: Option<String>,
    /// Case-insensitive substring of the topic signature.
    pub topic: Option<String>,
    /// Inclusive lower ledger bound.
    pub from_ledger: Option<u64>,
    /// Inclusive upper ledger bound.
    pub to_ledger: Option<u64>,
    /// Page size; defaults to 100, capped at 1000.
    pub limit: Option<u32>,
    pub offset: u32,
}

impl EventQuery {
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_QUERY_LIMIT)
            .clamp(1, MAX_QUERY_LIMIT)
    }

    /// Whether `record` passes every set predicate (ignores paging).
    pub fn accepts(&self, record: &EventRecord) -> bool {
        if let Some(c) = &self.contract_id {
            if &record.contract_id != c {
                return false;
            }
        }
        if let Some(t) = &self.topic {
            if !record
                .topic_signature
                .to_lowercase()
                .contains(&t.to_lowercase())
            {
                return false;
            }
        }
        if self.from_ledger.is_some_and(|from| record.ledger < from) {
            return false;
        }
        if self.to_ledger.is_some_and(|to| record.ledger > to) {
            return false;
        }
        true
    }
}

/// Idempotent event persistence plus the reads served to the query API.
///
/// `insert_events` must be safe to call concurrently; a record whose
/// [`EventKey`] already exists is silently skipped.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert records, ignoring duplicates. Returns the number of new rows.
    async fn insert_events(&self, records: &[EventRecord]) -> Result<u64, IndexerError>;

    /// Events matching `query`, ordered by ledger then insertion id.
    async fn query_events(&self, query: &EventQuery) -> Result<Vec<StoredEvent>, IndexerError>;

    /// Highest ledger stored, `None` when empty.
    async fn latest_ledger(&self) -> Result<Option<u64>, IndexerError>;
}

#[async_trait]
impl<T: EventStore + ?Sized> EventStore for std::sync::Arc<T> {
    async fn insert_events(&self, records: &[EventRecord]) -> Result<u64, IndexerError> {
        (**self).insert_events(records).await
    }

    async fn query_events(&self, query: &EventQuery) -> Result<Vec<StoredEvent>, IndexerError> {
        (**self).query_events(query).await
    }

    async fn latest_ledger(&self) -> Result<Option<u64>, IndexerError> {
        (**self).latest_ledger().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn record(contract: &str, ledger: u64, sig: &str) -> EventRecord {
        EventRecord::from_event(
            "testnet",
            &DecodedEvent {
                tx_hash: "ab".into(),
                contract_id: contract.into(),
                ledger,
                topics: vec![json!("TOKEN"), json!("mint")],
                value: json!({"amount": "5"}),
                topic_signature: sig.into(),
                decode_errors: BTreeMap::new(),
            },
        )
    }

    #[test]
    fn record_carries_event_fields() {
        let r = record("C1", 7, "TOKEN:mint");
        assert_eq!(r.topics, json!(["TOKEN", "mint"]));
        assert_eq!(r.data["amount"], "5");
        assert_eq!(r.key().ledger, 7);
    }

    #[test]
    fn same_event_same_key() {
        assert_eq!(record("C1", 7, "TOKEN:mint").key(), record("C1", 7, "TOKEN:mint").key());
        assert_ne!(record("C1", 7, "TOKEN:mint").key(), record("C1", 8, "TOKEN:mint").key());
    }

    #[test]
    fn limit_defaults_and_cap() {
        assert_eq!(EventQuery::default().effective_limit(), 100);
        let q = EventQuery {
            limit: Some(50_000),
            ..Default::default()
        };
        assert_eq!(q.effective_limit(), 1_000);
    }

    #[test]
    fn topic_filter_is_case_insensitive_substring() {
        let q = EventQuery {
            topic: Some("MINT".into()),
            ..Default::default()
        };
        assert!(q.accepts(&record("C1", 7, "TOKEN:mint")));
        assert!(!q.accepts(&record("C1", 7, "TOKEN:burn")));
    }

    #[test]
    fn ledger_bounds_are_inclusive() {
        let q = EventQuery {
            from_ledger: Some(10),
            to_ledger: Some(20),
            ..Default::default()
        };
        assert!(q.accepts(&record("C1", 10, "x")));
        assert!(q.accepts(&record("C1", 20, "x")));
        assert!(!q.accepts(&record("C1", 21, "x")));
        assert!(!q.accepts(&record("C1", 9, "x")));
    }

    #[test]
    fn stored_event_flattens_record() {
        let s = StoredEvent {
            id: 3,
            record: record("C1", 7, "TOKEN:mint"),
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["id"], 3);
        assert_eq!(v["contract_id"], "C1");
    }
}
