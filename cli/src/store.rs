//! Storage backend selection from `DATABASE_URL`.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use sorobanindex_core::{CheckpointStore, EventStore};
use sorobanindex_storage::{InMemoryStorage, PostgresStorage, SqliteStorage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTarget {
    Memory,
    SqliteMemory,
    Sqlite(String),
    Postgres(String),
}

impl StoreTarget {
    pub fn parse(url: &str) -> Self {
        let url = url.trim();
        if url.is_empty() || url.eq_ignore_ascii_case("memory") {
            Self::Memory
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Self::Postgres(url.to_string())
        } else if url == "sqlite::memory:" {
            Self::SqliteMemory
        } else {
            Self::Sqlite(url.to_string())
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::SqliteMemory | Self::Sqlite(_) => "sqlite",
            Self::Postgres(_) => "postgres",
        }
    }
}

/// Event store and checkpoint store backed by the same database.
pub struct Stores {
    pub events: Arc<dyn EventStore>,
    pub checkpoints: Box<dyn CheckpointStore>,
}

pub async fn open(target: &StoreTarget) -> Result<Stores> {
    let stores = match target {
        StoreTarget::Memory => {
            let mem = Arc::new(InMemoryStorage::new());
            Stores {
                events: mem.clone(),
                checkpoints: Box::new(mem),
            }
        }
        StoreTarget::SqliteMemory => {
            let db = SqliteStorage::in_memory().await.context("opening in-memory sqlite")?;
            Stores {
                events: Arc::new(db.clone()),
                checkpoints: Box::new(db),
            }
        }
        StoreTarget::Sqlite(path) => {
            let db = SqliteStorage::open(path)
                .await
                .with_context(|| format!("opening sqlite database {path}"))?;
            Stores {
                events: Arc::new(db.clone()),
                checkpoints: Box::new(db),
            }
        }
        StoreTarget::Postgres(url) => {
            let db = PostgresStorage::connect(url)
                .await
                .context("connecting to postgres")?;
            Stores {
                events: Arc::new(db.clone()),
                checkpoints: Box::new(db),
            }
        }
    };
    info!(backend = target.kind(), "storage ready");
    Ok(stores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sorobanindex_core::Checkpoint;

    #[test]
    fn parse_targets() {
        assert_eq!(StoreTarget::parse("memory"), StoreTarget::Memory);
        assert_eq!(StoreTarget::parse(""), StoreTarget::Memory);
        assert_eq!(StoreTarget::parse("sqlite::memory:"), StoreTarget::SqliteMemory);
        assert_eq!(
            StoreTarget::parse("./events.db"),
            StoreTarget::Sqlite("./events.db".into())
        );
        assert_eq!(
            StoreTarget::parse("postgresql://u:p@localhost/db").kind(),
            "postgres"
        );
    }

    #[tokio::test]
    async fn sqlite_memory_opens() {
        let stores = open(&StoreTarget::SqliteMemory).await.unwrap();
        assert_eq!(stores.events.latest_ledger().await.unwrap(), None);
        assert!(stores.checkpoints.load("testnet", "x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sqlite_file_target_opens() {
        let path = std::env::temp_dir().join(format!("sorobanindex-cli-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let target = StoreTarget::Sqlite(path.to_string_lossy().into_owned());

        let stores = open(&target).await.unwrap();
        stores
            .checkpoints
            .save(Checkpoint {
                network: "testnet".into(),
                indexer_id: "cli".into(),
                ledger: 77,
                updated_at: 0,
            })
            .await
            .unwrap();
        let saved = stores.checkpoints.load("testnet", "cli").await.unwrap();
        assert_eq!(saved.map(|cp| cp.ledger), Some(77));
        assert_eq!(stores.events.latest_ledger().await.unwrap(), None);

        drop(stores);
        let _ = std::fs::remove_file(&path);
    }
}
