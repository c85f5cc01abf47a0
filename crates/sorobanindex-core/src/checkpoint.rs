//! Checkpoint manager: persists the cursor high-water mark for crash recovery.
//!
//! A checkpoint stores the last fully committed ledger. On restart, the
//! scheduler resumes from the ledger after it rather than from the
//! configured start ledger.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::IndexerError;

/// A persisted checkpoint for an indexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Logical network name (e.g. `"testnet"`).
    pub network: String,
    /// Unique indexer identifier.
    pub indexer_id: String,
    /// Last fully committed ledger sequence.
    pub ledger: u64,
    /// Unix timestamp of when this checkpoint was saved.
    pub updated_at: i64,
}

/// Trait for storing and loading checkpoints.
///
/// Implemented by the memory, SQLite and Postgres backends in
/// `sorobanindex-storage`.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the latest checkpoint for a given network + indexer pair.
    async fn load(
        &self,
        network: &str,
        indexer_id: &str,
    ) -> Result<Option<Checkpoint>, IndexerError>;

    /// Save (upsert) a checkpoint.
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), IndexerError>;

    /// Delete a checkpoint (e.g. when resetting an indexer).
    async fn delete(&self, network: &str, indexer_id: &str) -> Result<(), IndexerError>;
}

#[async_trait]
impl<T: CheckpointStore + ?Sized> CheckpointStore for std::sync::Arc<T> {
    async fn load(
        &self,
        network: &str,
        indexer_id: &str,
    ) -> Result<Option<Checkpoint>, IndexerError> {
        (**self).load(network, indexer_id).await
    }

    async fn save(&self, checkpoint: Checkpoint) -> Result<(), IndexerError> {
        (**self).save(checkpoint).await
    }

    async fn delete(&self, network: &str, indexer_id: &str) -> Result<(), IndexerError> {
        (**self).delete(network, indexer_id).await
    }
}

/// Manages checkpoint reads/writes for an indexer.
pub struct CheckpointManager {
    store: Box<dyn CheckpointStore>,
    network: String,
    indexer_id: String,
    /// How often to save (every N committed ranges).
    save_interval: u64,
    /// Ranges committed since the last save.
    counter: u64,
}

impl CheckpointManager {
    pub fn new(
        store: Box<dyn CheckpointStore>,
        network: impl Into<String>,
        indexer_id: impl Into<String>,
        save_interval: u64,
    ) -> Self {
        Self {
            store,
            network: network.into(),
            indexer_id: indexer_id.into(),
            save_interval: save_interval.max(1),
            counter: 0,
        }
    }

    /// Load the saved checkpoint (returns `None` if none exists).
    pub async fn load(&self) -> Result<Option<Checkpoint>, IndexerError> {
        self.store.load(&self.network, &self.indexer_id).await
    }

    /// Conditionally save a checkpoint every `save_interval` committed ranges.
    ///
    /// Call this after each range is committed.
    pub async fn maybe_save(&mut self, ledger: u64) -> Result<(), IndexerError> {
        self.counter += 1;
        if self.counter >= self.save_interval {
            self.force_save(ledger).await?;
            self.counter = 0;
        }
        Ok(())
    }

    /// Immediately save a checkpoint (used on shutdown).
    pub async fn force_save(&self, ledger: u64) -> Result<(), IndexerError> {
        let cp = Checkpoint {
            network: self.network.clone(),
            indexer_id: self.indexer_id.clone(),
            ledger,
            updated_at: chrono::Utc::now().timestamp(),
        };
        self.store.save(cp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapStore(Mutex<HashMap<String, Checkpoint>>);

    #[async_trait]
    impl CheckpointStore for MapStore {
        async fn load(&self, n: &str, i: &str) -> Result<Option<Checkpoint>, IndexerError> {
            Ok(self.0.lock().unwrap().get(&format!("{n}:{i}")).cloned())
        }
        async fn save(&self, cp: Checkpoint) -> Result<(), IndexerError> {
            let key = format!("{}:{}", cp.network, cp.indexer_id);
            self.0.lock().unwrap().insert(key, cp);
            Ok(())
        }
        async fn delete(&self, n: &str, i: &str) -> Result<(), IndexerError> {
            self.0.lock().unwrap().remove(&format!("{n}:{i}"));
            Ok(())
        }
    }

    #[tokio::test]
    async fn force_save_then_load() {
        let mgr = CheckpointManager::new(Box::new(MapStore::default()), "testnet", "idx", 10);
        assert!(mgr.load().await.unwrap().is_none());

        mgr.force_save(1000).await.unwrap();

        let cp = mgr.load().await.unwrap().unwrap();
        assert_eq!(cp.ledger, 1000);
        assert_eq!(cp.network, "testnet");
        assert_eq!(cp.indexer_id, "idx");
    }

    #[tokio::test]
    async fn save_interval_counts_ranges() {
        let mut mgr = CheckpointManager::new(Box::new(MapStore::default()), "testnet", "idx", 3);

        mgr.maybe_save(99).await.unwrap();
        mgr.maybe_save(199).await.unwrap();
        assert!(mgr.load().await.unwrap().is_none());

        mgr.maybe_save(299).await.unwrap();
        assert_eq!(mgr.load().await.unwrap().unwrap().ledger, 299);
    }

    #[tokio::test]
    async fn zero_interval_saves_every_range() {
        let mut mgr = CheckpointManager::new(Box::new(MapStore::default()), "testnet", "idx", 0);
        mgr.maybe_save(5).await.unwrap();
        assert_eq!(mgr.load().await.unwrap().unwrap().ledger, 5);
    }
}
