//! sorobanindex-stellar: Stellar/Soroban adapters and the ingestion scheduler.
//!
//! - [`SorobanEventFetcher`]: ranged `getEvents` over any `RpcTransport`
//! - [`HorizonHeadTracker`]: newest closed ledger from Horizon
//! - [`encode_filter_set`]: handler filters → server-side RPC filters
//! - [`IndexLoop`]: the cursor scheduler
//! - [`IndexerBuilder`]: fluent construction

pub mod builder;
pub mod fetcher;
pub mod filters;
pub mod horizon;
pub mod index_loop;

pub use builder::{HttpIndexLoop, IndexerBuilder};
pub use fetcher::{
    decode_event, parse_range_hint, EventPage, EventSource, FetchError, ProbeReport, RawEvent,
    SorobanEventFetcher,
};
pub use filters::{encode_filter_set, encode_row, FilterSet, RpcEventFilter};
pub use horizon::{parse_head, HorizonHeadTracker, LedgerHeadSource};
pub use index_loop::{backoff_policy, IndexLoop, Step};
