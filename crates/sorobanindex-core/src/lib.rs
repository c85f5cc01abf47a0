//! sorobanindex-core: foundation for the Soroban event-ingestion pipeline.
//!
//! # Architecture
//!
//! ```text
//! IndexerBuilder → IndexLoop (cursor scheduler)
//!                      ├── LedgerHeadSource  (ledger-history head)
//!                      ├── EventSource       (ranged getEvents + decode)
//!                      ├── HandlerTable      (ordered, immutable, filter → handler)
//!                      ├── EventStore        (idempotent upsert + read queries)
//!                      └── CheckpointManager (cursor high-water mark)
//! ```
//!
//! This crate holds the chain-facing data model and the traits at each seam.
//! It has no codec or network dependency.

pub mod checkpoint;
pub mod cursor;
pub mod error;
pub mod filter;
pub mod handler;
pub mod indexer;
pub mod store;
pub mod types;

pub use checkpoint::{Checkpoint, CheckpointManager, CheckpointStore};
pub use cursor::Cursor;
pub use error::IndexerError;
pub use filter::{EventFilter, TopicMatcher, MAX_TOPICS, SEGMENT_KINDS};
pub use handler::{EventHandler, HandlerDefinition, HandlerTable};
pub use indexer::{DispatchMode, HandlerErrorPolicy, IndexerConfig, IndexerState, RetryConfig};
pub use store::{EventKey, EventQuery, EventRecord, EventStore, StoredEvent};
pub use types::{DecodedEvent, IndexContext, LedgerRange, RangeHint};
