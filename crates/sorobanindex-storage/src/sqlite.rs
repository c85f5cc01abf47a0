//! SQLite storage backend for SorobanIndex.
//!
//! Persists event rows and checkpoints to a single SQLite file.
//! Uses `sqlx` with WAL mode for concurrent read performance.
//!
//! # Usage
//! ```rust,no_run
//! use sorobanindex_storage::sqlite::SqliteStorage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let store = SqliteStorage::open("./events.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let store = SqliteStorage::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::debug;

use sorobanindex_core::{
    Checkpoint, CheckpointStore, EventQuery, EventRecord, EventStore, IndexerError, StoredEvent,
};

fn storage_err(e: impl std::fmt::Display) -> IndexerError {
    IndexerError::Storage(e.to_string())
}

/// SQLite-backed storage for event rows and checkpoints.
///
/// Cheaply cloneable; wraps a connection pool.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./events.db"`) or a full
    /// SQLite URL (`"sqlite:./events.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, IndexerError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let pool = SqlitePool::connect(&url).await.map_err(storage_err)?;
        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Pinned to a single connection so every query sees the same database.
    pub async fn in_memory() -> Result<Self, IndexerError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(storage_err)?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<(), IndexerError> {
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS checkpoints (
                network     TEXT    NOT NULL,
                indexer_id  TEXT    NOT NULL,
                ledger      INTEGER NOT NULL,
                updated_at  INTEGER NOT NULL,
                PRIMARY KEY (network, indexer_id)
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS events (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                network         TEXT    NOT NULL,
                tx_hash         TEXT    NOT NULL,
                contract_id     TEXT    NOT NULL,
                ledger          INTEGER NOT NULL,
                topic_signature TEXT    NOT NULL,
                topics          TEXT    NOT NULL,
                data            TEXT    NOT NULL,
                created_at      TEXT    NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_events_identity
             ON events (tx_hash, contract_id, ledger, topic_signature);",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_ledger ON events (ledger);")
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_contract ON events (contract_id);")
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(())
    }
}

fn row_to_event(row: &SqliteRow) -> Result<StoredEvent, IndexerError> {
    let topics: String = row.get("topics");
    let data: String = row.get("data");
    Ok(StoredEvent {
        id: row.get("id"),
        record: EventRecord {
            network: row.get("network"),
            tx_hash: row.get("tx_hash"),
            contract_id: row.get("contract_id"),
            ledger: row.get::<i64, _>("ledger") as u64,
            topic_signature: row.get("topic_signature"),
            topics: serde_json::from_str(&topics).map_err(storage_err)?,
            data: serde_json::from_str(&data).map_err(storage_err)?,
            created_at: row.get::<DateTime<Utc>, _>("created_at"),
        },
    })
}

// ─── EventStore impl ─────────────────────────────────────────────────────────

#[async_trait]
impl EventStore for SqliteStorage {
    async fn insert_events(&self, records: &[EventRecord]) -> Result<u64, IndexerError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        let mut inserted = 0;

        for r in records {
            let topics = serde_json::to_string(&r.topics).map_err(storage_err)?;
            let data = serde_json::to_string(&r.data).map_err(storage_err)?;
            let result = sqlx::query(
                "INSERT OR IGNORE INTO events
                 (network, tx_hash, contract_id, ledger, topic_signature, topics, data, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&r.network)
            .bind(&r.tx_hash)
            .bind(&r.contract_id)
            .bind(r.ledger as i64)
            .bind(&r.topic_signature)
            .bind(&topics)
            .bind(&data)
            .bind(r.created_at)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
            inserted += result.rows_affected();
        }

        tx.commit().await.map_err(storage_err)?;
        debug!(batch = records.len(), inserted, "events stored");
        Ok(inserted)
    }

    async fn query_events(&self, query: &EventQuery) -> Result<Vec<StoredEvent>, IndexerError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, network, tx_hash, contract_id, ledger, topic_signature, topics, data, created_at
             FROM events WHERE 1 = 1",
        );
        if let Some(c) = &query.contract_id {
            qb.push(" AND contract_id = ").push_bind(c.clone());
        }
        if let Some(t) = &query.topic {
            qb.push(" AND instr(lower(topic_signature), ")
                .push_bind(t.to_lowercase())
                .push(") > 0");
        }
        if let Some(from) = query.from_ledger {
            qb.push(" AND ledger >= ").push_bind(from as i64);
        }
        if let Some(to) = query.to_ledger {
            qb.push(" AND ledger <= ").push_bind(to as i64);
        }
        qb.push(" ORDER BY ledger, id LIMIT ")
            .push_bind(query.effective_limit() as i64)
            .push(" OFFSET ")
            .push_bind(query.offset as i64);

        let rows = qb.build().fetch_all(&self.pool).await.map_err(storage_err)?;
        rows.iter().map(row_to_event).collect()
    }

    async fn latest_ledger(&self) -> Result<Option<u64>, IndexerError> {
        let row = sqlx::query("SELECT MAX(ledger) AS latest FROM events")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(row.get::<Option<i64>, _>("latest").map(|l| l as u64))
    }
}

// ─── CheckpointStore impl ────────────────────────────────────────────────────

#[async_trait]
impl CheckpointStore for SqliteStorage {
    async fn load(
        &self,
        network: &str,
        indexer_id: &str,
    ) -> Result<Option<Checkpoint>, IndexerError> {
        let row = sqlx::query(
            "SELECT network, indexer_id, ledger, updated_at
             FROM checkpoints WHERE network = ? AND indexer_id = ?",
        )
        .bind(network)
        .bind(indexer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(row.map(|r| Checkpoint {
            network: r.get("network"),
            indexer_id: r.get("indexer_id"),
            ledger: r.get::<i64, _>("ledger") as u64,
            updated_at: r.get("updated_at"),
        }))
    }

    async fn save(&self, checkpoint: Checkpoint) -> Result<(), IndexerError> {
        sqlx::query(
            "INSERT OR REPLACE INTO checkpoints (network, indexer_id, ledger, updated_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&checkpoint.network)
        .bind(&checkpoint.indexer_id)
        .bind(checkpoint.ledger as i64)
        .bind(checkpoint.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        debug!(
            network = %checkpoint.network,
            indexer_id = %checkpoint.indexer_id,
            ledger = checkpoint.ledger,
            "checkpoint saved"
        );
        Ok(())
    }

    async fn delete(&self, network: &str, indexer_id: &str) -> Result<(), IndexerError> {
        sqlx::query("DELETE FROM checkpoints WHERE network = ? AND indexer_id = ?")
            .bind(network)
            .bind(indexer_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(tx: &str, contract: &str, ledger: u64, sig: &str) -> EventRecord {
        EventRecord {
            network: "testnet".into(),
            tx_hash: tx.into(),
            contract_id: contract.into(),
            ledger,
            topic_signature: sig.into(),
            topics: json!(["TOKEN", "mint", "GABC", "5"]),
            data: json!({"amount": "340282366920938463463374607431768211455"}),
            created_at: Utc::now(),
        }
    }

    // ── CheckpointStore ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn checkpoint_upsert() {
        let store = SqliteStorage::in_memory().await.unwrap();
        for ledger in [100, 200] {
            store
                .save(Checkpoint {
                    network: "testnet".into(),
                    indexer_id: "idx".into(),
                    ledger,
                    updated_at: ledger as i64,
                })
                .await
                .unwrap();
        }
        let loaded = store.load("testnet", "idx").await.unwrap().unwrap();
        assert_eq!(loaded.ledger, 200);
        assert_eq!(loaded.updated_at, 200);
    }

    #[tokio::test]
    async fn checkpoint_missing_and_delete() {
        let store = SqliteStorage::in_memory().await.unwrap();
        assert!(store.load("testnet", "nope").await.unwrap().is_none());

        store
            .save(Checkpoint {
                network: "testnet".into(),
                indexer_id: "del".into(),
                ledger: 5,
                updated_at: 0,
            })
            .await
            .unwrap();
        store.delete("testnet", "del").await.unwrap();
        assert!(store.load("testnet", "del").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clones_share_one_database() {
        let store = SqliteStorage::in_memory().await.unwrap();
        let events = store.clone();
        events.insert_events(&[rec("a", "C1", 42, "TOKEN:mint")]).await.unwrap();
        assert_eq!(store.latest_ledger().await.unwrap(), Some(42));
    }

    // ── EventStore ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn replay_inserts_nothing() {
        let store = SqliteStorage::in_memory().await.unwrap();
        let batch = [
            rec("a", "C1", 10, "TOKEN:mint"),
            rec("b", "C1", 11, "TOKEN:mint"),
        ];
        assert_eq!(store.insert_events(&batch).await.unwrap(), 2);
        assert_eq!(store.insert_events(&batch).await.unwrap(), 0);
        assert_eq!(store.latest_ledger().await.unwrap(), Some(11));
    }

    #[tokio::test]
    async fn json_columns_roundtrip() {
        let store = SqliteStorage::in_memory().await.unwrap();
        store.insert_events(&[rec("a", "C1", 10, "TOKEN:mint")]).await.unwrap();
        let rows = store.query_events(&EventQuery::default()).await.unwrap();
        assert_eq!(rows[0].record.topics[3], "5");
        assert_eq!(
            rows[0].record.data["amount"],
            "340282366920938463463374607431768211455"
        );
    }

    #[tokio::test]
    async fn query_filters() {
        let store = SqliteStorage::in_memory().await.unwrap();
        store
            .insert_events(&[
                rec("a", "C1", 10, "TOKEN:mint"),
                rec("b", "C2", 20, "LOCK:deposit"),
                rec("c", "C1", 30, "TOKEN:update_metadata"),
            ])
            .await
            .unwrap();

        let by_contract = store
            .query_events(&EventQuery {
                contract_id: Some("C1".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_contract.len(), 2);

        let by_topic = store
            .query_events(&EventQuery {
                topic: Some("DEPOSIT".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_topic.len(), 1);
        assert_eq!(by_topic[0].record.ledger, 20);

        let by_range = store
            .query_events(&EventQuery {
                from_ledger: Some(15),
                to_ledger: Some(30),
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_range.len(), 1);
        assert_eq!(by_range[0].record.tx_hash, "b");
    }
}
