//! In-memory storage backend.
//!
//! Stores event rows and checkpoints in RAM.
//! Useful for testing and short-lived indexers that don't need persistence.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use sorobanindex_core::{
    Checkpoint, CheckpointStore, EventKey, EventQuery, EventRecord, EventStore, IndexerError,
    StoredEvent,
};

#[derive(Default)]
struct EventTable {
    rows: Vec<StoredEvent>,
    keys: HashSet<EventKey>,
    next_id: i64,
}

/// In-memory indexer storage.
///
/// All data is lost when the process exits.
#[derive(Default)]
pub struct InMemoryStorage {
    checkpoints: Mutex<HashMap<String, Checkpoint>>,
    events: Mutex<EventTable>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored events.
    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().rows.len()
    }

    /// Every stored event in insertion order.
    pub fn all_events(&self) -> Vec<StoredEvent> {
        self.events.lock().unwrap().rows.clone()
    }
}

#[async_trait]
impl EventStore for InMemoryStorage {
    async fn insert_events(&self, records: &[EventRecord]) -> Result<u64, IndexerError> {
        let mut table = self.events.lock().unwrap();
        let mut inserted = 0;
        for record in records {
            if !table.keys.insert(record.key()) {
                continue;
            }
            table.next_id += 1;
            let id = table.next_id;
            table.rows.push(StoredEvent {
                id,
                record: record.clone(),
            });
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn query_events(&self, query: &EventQuery) -> Result<Vec<StoredEvent>, IndexerError> {
        let table = self.events.lock().unwrap();
        let mut hits: Vec<&StoredEvent> =
            table.rows.iter().filter(|e| query.accepts(&e.record)).collect();
        hits.sort_by_key(|e| (e.record.ledger, e.id));
        Ok(hits
            .into_iter()
            .skip(query.offset as usize)
            .take(query.effective_limit() as usize)
            .cloned()
            .collect())
    }

    async fn latest_ledger(&self) -> Result<Option<u64>, IndexerError> {
        let table = self.events.lock().unwrap();
        Ok(table.rows.iter().map(|e| e.record.ledger).max())
    }
}

#[async_trait]
impl CheckpointStore for InMemoryStorage {
    async fn load(
        &self,
        network: &str,
        indexer_id: &str,
    ) -> Result<Option<Checkpoint>, IndexerError> {
        let key = format!("{network}:{indexer_id}");
        Ok(self.checkpoints.lock().unwrap().get(&key).cloned())
    }

    async fn save(&self, checkpoint: Checkpoint) -> Result<(), IndexerError> {
        let key = format!("{}:{}", checkpoint.network, checkpoint.indexer_id);
        self.checkpoints.lock().unwrap().insert(key, checkpoint);
        Ok(())
    }

    async fn delete(&self, network: &str, indexer_id: &str) -> Result<(), IndexerError> {
        let key = format!("{network}:{indexer_id}");
        self.checkpoints.lock().unwrap().remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn rec(tx: &str, ledger: u64, sig: &str) -> EventRecord {
        EventRecord {
            network: "testnet".into(),
            tx_hash: tx.into(),
            contract_id: "CTOKEN".into(),
            ledger,
            topic_signature: sig.into(),
            topics: json!(["TOKEN", "mint"]),
            data: json!({"amount": "10"}),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_keys_are_ignored() {
        let store = InMemoryStorage::new();
        let batch = [rec("a", 10, "TOKEN:mint"), rec("b", 11, "TOKEN:mint")];
        assert_eq!(store.insert_events(&batch).await.unwrap(), 2);
        assert_eq!(store.insert_events(&batch).await.unwrap(), 0);
        assert_eq!(store.event_count(), 2);
    }

    #[tokio::test]
    async fn same_tx_different_signature_is_distinct() {
        let store = InMemoryStorage::new();
        let batch = [rec("a", 10, "TOKEN:mint"), rec("a", 10, "TOKEN:burn")];
        assert_eq!(store.insert_events(&batch).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn query_orders_and_pages() {
        let store = InMemoryStorage::new();
        store
            .insert_events(&[
                rec("c", 30, "LOCK:deposit"),
                rec("a", 10, "TOKEN:mint"),
                rec("b", 20, "TOKEN:mint"),
            ])
            .await
            .unwrap();

        let all = store.query_events(&EventQuery::default()).await.unwrap();
        let ledgers: Vec<_> = all.iter().map(|e| e.record.ledger).collect();
        assert_eq!(ledgers, vec![10, 20, 30]);

        let page = store
            .query_events(&EventQuery {
                topic: Some("mint".into()),
                limit: Some(1),
                offset: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].record.tx_hash, "b");

        assert_eq!(store.latest_ledger().await.unwrap(), Some(30));
    }

    #[tokio::test]
    async fn checkpoint_roundtrip() {
        let store = InMemoryStorage::new();
        let cp = Checkpoint {
            network: "testnet".into(),
            indexer_id: "idx".into(),
            ledger: 1_000,
            updated_at: 0,
        };
        store.save(cp.clone()).await.unwrap();
        let loaded = store.load("testnet", "idx").await.unwrap().unwrap();
        assert_eq!(loaded.ledger, 1_000);

        store.delete("testnet", "idx").await.unwrap();
        assert!(store.load("testnet", "idx").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_store_has_no_latest() {
        assert_eq!(InMemoryStorage::new().latest_ledger().await.unwrap(), None);
    }
}
