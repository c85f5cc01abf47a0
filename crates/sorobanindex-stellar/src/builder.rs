//! Fluent builder API for creating Soroban indexers.
//!
//! # Example
//!
//! ```rust,no_run
//! use sorobanindex_stellar::IndexerBuilder;
//!
//! let config = IndexerBuilder::new()
//!     .network("testnet")
//!     .start_ledger(1_200_000)
//!     .chunk_size(200)
//!     .build_config();
//! ```

use std::sync::Arc;

use sorobanindex_core::{
    CheckpointStore, DispatchMode, EventFilter, EventHandler, EventStore, HandlerErrorPolicy,
    HandlerTable, IndexerConfig, IndexerError, RetryConfig,
};
use sorobanindex_rpc::{HttpClientConfig, HttpRpcClient};

use crate::fetcher::{EventSource, SorobanEventFetcher};
use crate::horizon::{HorizonHeadTracker, LedgerHeadSource};
use crate::index_loop::IndexLoop;

/// An [`IndexLoop`] over Soroban RPC and Horizon HTTP endpoints.
pub type HttpIndexLoop = IndexLoop<SorobanEventFetcher<HttpRpcClient>, HorizonHeadTracker>;

/// Fluent builder for `IndexerConfig` plus the handler table.
#[derive(Default)]
pub struct IndexerBuilder {
    config: IndexerConfig,
    handlers: Vec<(EventFilter, Arc<dyn EventHandler>)>,
}

impl IndexerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: IndexerConfig) -> Self {
        Self {
            config,
            handlers: Vec::new(),
        }
    }

    /// Set the indexer ID (used for checkpoint keys).
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.config.id = id.into();
        self
    }

    pub fn network(mut self, network: impl Into<String>) -> Self {
        self.config.network = network.into();
        self
    }

    /// First ledger to ingest when no checkpoint exists.
    pub fn start_ledger(mut self, ledger: u64) -> Self {
        self.config.start_ledger = ledger;
        self
    }

    /// Stop once this ledger is committed.
    pub fn to_ledger(mut self, ledger: u64) -> Self {
        self.config.to_ledger = Some(ledger);
        self
    }

    /// Ledgers per `getEvents` request.
    pub fn chunk_size(mut self, size: u64) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn page_limit(mut self, limit: u32) -> Self {
        self.config.page_limit = limit;
        self
    }

    pub fn head_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.head_poll_interval_ms = ms;
        self
    }

    pub fn request_spacing_ms(mut self, ms: u64) -> Self {
        self.config.request_spacing_ms = ms;
        self
    }

    pub fn backoff(mut self, backoff: RetryConfig) -> Self {
        self.config.backoff = backoff;
        self
    }

    /// Save a checkpoint every N committed ranges.
    pub fn checkpoint_interval(mut self, n: u64) -> Self {
        self.config.checkpoint_interval = n;
        self
    }

    pub fn dispatch_concurrency(mut self, n: usize) -> Self {
        self.config.dispatch_concurrency = n;
        self
    }

    pub fn dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.config.dispatch_mode = mode;
        self
    }

    pub fn handler_error_policy(mut self, policy: HandlerErrorPolicy) -> Self {
        self.config.handler_error_policy = policy;
        self
    }

    /// Register `handler` for events matching `filter`. Order matters
    /// under [`DispatchMode::FirstMatch`].
    pub fn on(mut self, filter: EventFilter, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.push((filter, handler));
        self
    }

    /// Build the `IndexerConfig`.
    pub fn build_config(self) -> IndexerConfig {
        self.config
    }

    /// Build and validate the handler table.
    pub fn build_handlers(&self) -> Result<HandlerTable, IndexerError> {
        self.handlers
            .iter()
            .fold(HandlerTable::builder(), |b, (f, h)| b.on(f.clone(), h.clone()))
            .build()
    }

    /// Assemble a scheduler over arbitrary sources.
    pub fn build<S, H>(
        self,
        source: S,
        head: H,
        store: Arc<dyn EventStore>,
        checkpoints: Box<dyn CheckpointStore>,
    ) -> Result<IndexLoop<S, H>, IndexerError>
    where
        S: EventSource,
        H: LedgerHeadSource,
    {
        let handlers = self.build_handlers()?;
        IndexLoop::new(self.config, source, head, handlers, store, checkpoints)
    }

    /// Assemble a scheduler talking to Soroban RPC and Horizon over HTTP.
    pub fn connect(
        self,
        rpc_url: &str,
        horizon_url: &str,
        store: Arc<dyn EventStore>,
        checkpoints: Box<dyn CheckpointStore>,
    ) -> Result<HttpIndexLoop, IndexerError> {
        let client = HttpRpcClient::new(rpc_url, HttpClientConfig::default())
            .map_err(|e| IndexerError::Transport(e.to_string()))?;
        let fetcher = SorobanEventFetcher::new(client, self.config.page_limit);
        let head = HorizonHeadTracker::new(horizon_url)?;
        self.build(fetcher, head, store, checkpoints)
    }
}
