//! Indexer configuration and state types.

use serde::{Deserialize, Serialize};

use crate::error::IndexerError;

/// How many handlers receive an event that matches several definitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Only the first matching definition, in registration order.
    #[default]
    FirstMatch,
    /// Every matching definition.
    AllMatches,
}

/// What the scheduler does when a handler returns an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerErrorPolicy {
    /// Log the failure; the event still counts as processed.
    #[default]
    LogAndContinue,
    /// Back off and retry the whole range (handlers must be idempotent).
    RetryRange,
}

/// Backoff between failed cycles.
///
/// The default is a fixed 2 s delay with unlimited attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Delay before the first retry (milliseconds).
    pub initial_backoff_ms: u64,
    /// Upper bound on the delay (milliseconds).
    pub max_backoff_ms: u64,
    /// Growth factor per consecutive failure; `1.0` keeps the delay fixed.
    pub multiplier: f64,
    /// Give up after this many consecutive failures. `None` = never.
    pub max_retries: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 2_000,
            max_backoff_ms: 2_000,
            multiplier: 1.0,
            max_retries: None,
        }
    }
}

/// Configuration for an indexer instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Unique name for this indexer (used for checkpoint keys).
    pub id: String,
    /// Logical network name (e.g. `"testnet"`), stored with every record.
    pub network: String,
    /// First ledger to ingest when no checkpoint exists.
    pub start_ledger: u64,
    /// Optional last ledger (for bounded backfill). `None` = run forever.
    pub to_ledger: Option<u64>,
    /// Ledgers per `getEvents` request.
    pub chunk_size: u64,
    /// `pagination.limit` sent with each request.
    pub page_limit: u32,
    /// Head polling interval while waiting at the tip (milliseconds).
    pub head_poll_interval_ms: u64,
    /// Delay between successful cycles (milliseconds).
    pub request_spacing_ms: u64,
    /// Backoff applied after a failed cycle.
    pub backoff: RetryConfig,
    /// Save a checkpoint every N committed ranges.
    pub checkpoint_interval: u64,
    /// Handler invocations in flight within one dispatch phase.
    pub dispatch_concurrency: usize,
    pub dispatch_mode: DispatchMode,
    pub handler_error_policy: HandlerErrorPolicy,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            id: "default".into(),
            network: "testnet".into(),
            start_ledger: 1,
            to_ledger: None,
            chunk_size: 100,
            page_limit: 10_000,
            head_poll_interval_ms: 2_000,
            request_spacing_ms: 500,
            backoff: RetryConfig::default(),
            checkpoint_interval: 1,
            dispatch_concurrency: 1,
            dispatch_mode: DispatchMode::FirstMatch,
            handler_error_policy: HandlerErrorPolicy::LogAndContinue,
        }
    }
}

impl IndexerConfig {
    /// Reject settings the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), IndexerError> {
        if self.chunk_size == 0 {
            return Err(IndexerError::Config("chunk_size must be > 0".into()));
        }
        if self.page_limit == 0 {
            return Err(IndexerError::Config("page_limit must be > 0".into()));
        }
        if self.dispatch_concurrency == 0 {
            return Err(IndexerError::Config("dispatch_concurrency must be > 0".into()));
        }
        if self.backoff.multiplier < 1.0 {
            return Err(IndexerError::Config("backoff multiplier must be >= 1.0".into()));
        }
        if let Some(to) = self.to_ledger {
            if to < self.start_ledger {
                return Err(IndexerError::Config(format!(
                    "to_ledger {to} is below start_ledger {}",
                    self.start_ledger
                )));
            }
        }
        Ok(())
    }
}

/// Runtime state of the indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexerState {
    /// Not yet started.
    Idle,
    /// Requesting a ledger range.
    Fetching,
    /// Routing a fetched range to handlers and the store.
    Dispatching,
    /// Jumping into the RPC retention window.
    Repositioning,
    /// Caught up with the head; polling for a new ledger.
    Waiting,
    /// Sleeping after a failed cycle.
    BackingOff,
    /// Reached `to_ledger` or was shut down.
    Stopped,
    /// Gave up after exhausting the retry budget.
    Error,
}

impl std::fmt::Display for IndexerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Fetching => write!(f, "fetching"),
            Self::Dispatching => write!(f, "dispatching"),
            Self::Repositioning => write!(f, "repositioning"),
            Self::Waiting => write!(f, "waiting"),
            Self::BackingOff => write!(f, "backing-off"),
            Self::Stopped => write!(f, "stopped"),
            Self::Error => write!(f, "error"),
        }
    }
}
