//! Command-line and environment configuration.
//!
//! Every option can be given as a flag or through the environment variable
//! shown in `--help`.

use clap::Args;

use sorobanindex_core::{DispatchMode, HandlerErrorPolicy, IndexerConfig, RetryConfig};

use crate::logging::LogConfig;

// ─── Logging ─────────────────────────────────────────────────────────────────

#[derive(Args, Debug, Clone)]
pub struct LogArgs {
    /// Global log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Per-crate levels, e.g. `sorobanindex-stellar=debug,sorobanindex-rpc=trace`
    #[arg(long, env = "LOG_COMPONENTS", default_value = "", global = true)]
    pub log_components: String,

    /// Emit JSON log lines
    #[arg(long, env = "LOG_JSON", global = true)]
    pub log_json: bool,
}

impl LogArgs {
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level.clone(),
            json: self.log_json,
            ..Default::default()
        }
        .with_components(&self.log_components)
    }
}

// ─── Endpoints ───────────────────────────────────────────────────────────────

#[derive(Args, Debug, Clone)]
pub struct RpcArgs {
    /// Soroban RPC endpoint
    #[arg(long, env = "SOROBAN_RPC_URL")]
    pub rpc_url: String,
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// `postgres://…`, `sqlite:…`, a SQLite file path, or `memory`
    #[arg(long, env = "DATABASE_URL", default_value = "memory")]
    pub database_url: String,
}

// ─── run ─────────────────────────────────────────────────────────────────────

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub rpc: RpcArgs,

    /// Horizon endpoint used for the ledger head
    #[arg(long, env = "HORIZON_URL")]
    pub horizon_url: String,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Indexer name used as the checkpoint key
    #[arg(long, env = "INDEXER_ID", default_value = "sorobanindex")]
    pub indexer_id: String,

    /// Network label stored with every event
    #[arg(long, env = "NETWORK", default_value = "testnet")]
    pub network: String,

    /// First ledger when no checkpoint exists
    #[arg(long, env = "START_LEDGER", default_value_t = 1)]
    pub start_ledger: u64,

    /// Stop after this ledger has been committed
    #[arg(long, env = "TO_LEDGER")]
    pub to_ledger: Option<u64>,

    /// Ledgers per getEvents request
    #[arg(long, env = "CHUNK_SIZE", default_value_t = 100)]
    pub chunk_size: u64,

    /// pagination.limit per request
    #[arg(long, env = "PAGE_LIMIT", default_value_t = 10_000)]
    pub page_limit: u32,

    /// Head polling interval at the tip (ms)
    #[arg(long, env = "HEAD_POLL_MS", default_value_t = 2_000)]
    pub head_poll_ms: u64,

    /// Pause between successful requests (ms)
    #[arg(long, env = "REQUEST_SPACING_MS", default_value_t = 500)]
    pub request_spacing_ms: u64,

    /// Delay after a failed cycle (ms)
    #[arg(long, env = "BACKOFF_MS", default_value_t = 2_000)]
    pub backoff_ms: u64,

    /// Upper bound on the backoff delay (ms)
    #[arg(long, env = "MAX_BACKOFF_MS", default_value_t = 2_000)]
    pub max_backoff_ms: u64,

    /// Backoff growth per consecutive failure
    #[arg(long, env = "BACKOFF_MULTIPLIER", default_value_t = 1.0)]
    pub backoff_multiplier: f64,

    /// Give up after this many consecutive failures (default: never)
    #[arg(long, env = "MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// Save a checkpoint every N committed ranges
    #[arg(long, env = "CHECKPOINT_INTERVAL", default_value_t = 1)]
    pub checkpoint_interval: u64,

    /// Concurrent handler invocations per range
    #[arg(long, env = "DISPATCH_CONCURRENCY", default_value_t = 1)]
    pub dispatch_concurrency: usize,

    /// Deliver each event to every matching handler instead of the first
    #[arg(long, env = "ALL_MATCHES")]
    pub all_matches: bool,

    /// Retry the whole range when a handler fails instead of logging
    #[arg(long, env = "RETRY_ON_HANDLER_ERROR")]
    pub retry_on_handler_error: bool,

    /// Comma-separated contract ids; scopes every handler filter
    #[arg(long, env = "CONTRACT_IDS", default_value = "")]
    pub contract_ids: String,
}

impl RunArgs {
    pub fn to_indexer_config(&self) -> IndexerConfig {
        IndexerConfig {
            id: self.indexer_id.clone(),
            network: self.network.clone(),
            start_ledger: self.start_ledger,
            to_ledger: self.to_ledger,
            chunk_size: self.chunk_size,
            page_limit: self.page_limit,
            head_poll_interval_ms: self.head_poll_ms,
            request_spacing_ms: self.request_spacing_ms,
            backoff: RetryConfig {
                initial_backoff_ms: self.backoff_ms,
                max_backoff_ms: self.max_backoff_ms,
                multiplier: self.backoff_multiplier,
                max_retries: self.max_retries,
            },
            checkpoint_interval: self.checkpoint_interval,
            dispatch_concurrency: self.dispatch_concurrency,
            dispatch_mode: if self.all_matches {
                DispatchMode::AllMatches
            } else {
                DispatchMode::FirstMatch
            },
            handler_error_policy: if self.retry_on_handler_error {
                HandlerErrorPolicy::RetryRange
            } else {
                HandlerErrorPolicy::LogAndContinue
            },
        }
    }

    pub fn contract_ids(&self) -> Vec<String> {
        split_list(&self.contract_ids)
    }
}

/// Split a comma-separated list, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
