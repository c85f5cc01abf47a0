//! The cursor scheduler: one ledger range per cycle, forever.
//!
//! Each cycle:
//!   1. Read the head and derive the next range from the cursor
//!   2. Fetch and decode the range (tagged out-of-range → reposition)
//!   3. Route matched events to handlers, persist them, checkpoint
//!   4. At the tip, poll the head until a new ledger closes
//!   5. Advance the cursor past what was committed
//!
//! Any transient failure backs off and retries the same range. The cursor
//! only moves after a range is fully dispatched and stored, or on an
//! explicit reposition into the RPC's retention window.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use sorobanindex_core::{
    CheckpointManager, CheckpointStore, Cursor, DecodedEvent, EventRecord, EventStore,
    HandlerDefinition, HandlerErrorPolicy, HandlerTable, IndexContext, IndexerConfig,
    IndexerError, IndexerState, LedgerRange, RangeHint, RetryConfig,
};
use sorobanindex_rpc::{BackoffConfig, RetryPolicy};

use crate::fetcher::{EventPage, EventSource, FetchError};
use crate::filters::{encode_filter_set, FilterSet};
use crate::horizon::LedgerHeadSource;

/// Outcome of a single scheduler cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A range was dispatched, stored and committed.
    Indexed {
        range: LedgerRange,
        total: usize,
        matched: usize,
        stored: u64,
    },
    /// The cursor jumped into the RPC's retention window.
    Repositioned { from: u64, to: u64, hint: RangeHint },
    /// Nothing to fetch yet; waited for the head to move.
    Waited { next_ledger: u64, head: u64 },
    /// The cycle failed; slept before retrying the same range.
    BackedOff {
        attempt: u32,
        delay: Duration,
        reason: String,
    },
    /// `to_ledger` has been committed.
    Finished { at: u64 },
}

/// Map the serde-facing backoff settings onto the transport retry policy.
pub fn backoff_policy(cfg: &RetryConfig) -> RetryPolicy {
    RetryPolicy::new(BackoffConfig {
        max_retries: cfg.max_retries,
        initial: Duration::from_millis(cfg.initial_backoff_ms),
        max: Duration::from_millis(cfg.max_backoff_ms.max(cfg.initial_backoff_ms)),
        multiplier: cfg.multiplier,
    })
}

/// The ingestion scheduler.
pub struct IndexLoop<S: EventSource, H: LedgerHeadSource> {
    config: IndexerConfig,
    source: S,
    head: H,
    handlers: Arc<HandlerTable>,
    filters: FilterSet,
    store: Arc<dyn EventStore>,
    checkpoint: CheckpointManager,
    cursor: Cursor,
    backoff: RetryPolicy,
    /// Consecutive failed cycles.
    failures: u32,
    /// Head reported by the RPC on the last successful fetch.
    rpc_latest: Option<u64>,
    /// Last ledger committed during this run.
    committed: Option<u64>,
    resumed: bool,
    state: IndexerState,
}

impl<S: EventSource, H: LedgerHeadSource> IndexLoop<S, H> {
    pub fn new(
        config: IndexerConfig,
        source: S,
        head: H,
        handlers: impl Into<Arc<HandlerTable>>,
        store: Arc<dyn EventStore>,
        checkpoints: Box<dyn CheckpointStore>,
    ) -> Result<Self, IndexerError> {
        config.validate()?;
        let handlers = handlers.into();
        let filters = encode_filter_set(&handlers)?;
        let checkpoint = CheckpointManager::new(
            checkpoints,
            &config.network,
            &config.id,
            config.checkpoint_interval,
        );
        Ok(Self {
            cursor: Cursor::new(config.start_ledger),
            backoff: backoff_policy(&config.backoff),
            source,
            head,
            handlers,
            filters,
            store,
            checkpoint,
            failures: 0,
            rpc_latest: None,
            committed: None,
            resumed: false,
            state: IndexerState::Idle,
            config,
        })
    }

    pub fn state(&self) -> IndexerState {
        self.state
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Load the checkpoint and position the cursor. Idempotent.
    pub async fn resume(&mut self) -> Result<u64, IndexerError> {
        if !self.resumed {
            let saved = self.checkpoint.load().await?;
            self.cursor = Cursor::resume(self.config.start_ledger, saved.as_ref());
            match saved {
                Some(cp) => tracing::info!(
                    ledger = cp.ledger,
                    next = self.cursor.next_ledger,
                    indexer = %self.config.id,
                    "Resuming from checkpoint"
                ),
                None => tracing::info!(
                    next = self.cursor.next_ledger,
                    indexer = %self.config.id,
                    "No checkpoint, starting fresh"
                ),
            }
            self.resumed = true;
        }
        Ok(self.cursor.next_ledger)
    }

    /// Run until `to_ledger` is committed, or forever.
    pub async fn run(&mut self) -> Result<(), IndexerError> {
        self.run_until(std::future::pending()).await
    }

    /// Run until `to_ledger` is committed or `shutdown` resolves.
    ///
    /// On shutdown the in-flight cycle is dropped and the last committed
    /// ledger is checkpointed.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<(), IndexerError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!(
            indexer = %self.config.id,
            network = %self.config.network,
            handlers = self.handlers.len(),
            filter_rows = self.filters.row_count(),
            "Starting indexer"
        );

        loop {
            let outcome = tokio::select! {
                _ = &mut shutdown => None,
                step = self.step() => Some(step),
            };
            match outcome {
                None => {
                    self.state = IndexerState::Stopped;
                    self.flush_checkpoint().await;
                    tracing::info!(next = self.cursor.next_ledger, "Indexer stopped");
                    return Ok(());
                }
                Some(Ok(Step::Finished { at })) => {
                    self.flush_checkpoint().await;
                    tracing::info!(at, "Reached to_ledger");
                    return Ok(());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e),
            }
        }
    }

    /// Execute one cycle.
    ///
    /// `Err` only for failures that retrying cannot fix; everything else
    /// comes back as [`Step::BackedOff`].
    pub async fn step(&mut self) -> Result<Step, IndexerError> {
        let outcome = match self.resume().await {
            Ok(next) => match self.config.to_ledger {
                Some(to) if next > to => {
                    self.state = IndexerState::Stopped;
                    return Ok(Step::Finished { at: to });
                }
                _ => self.cycle().await,
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(step) => {
                self.failures = 0;
                Ok(step)
            }
            Err(e) if e.is_transient() => self.back_off(e).await,
            Err(e) => {
                self.state = IndexerState::Error;
                Err(e)
            }
        }
    }

    async fn cycle(&mut self) -> Result<Step, IndexerError> {
        self.state = IndexerState::Fetching;
        let next = self.cursor.next_ledger;
        let head = self.head.latest_ledger().await?;

        // the RPC head only caps ranges it still covers
        let mut bound = match self.rpc_latest {
            Some(latest) if latest >= next => head.min(latest),
            _ => head,
        };
        if let Some(to) = self.config.to_ledger {
            bound = bound.min(to);
        }

        let Some(range) = self.cursor.next_range(self.config.chunk_size, bound) else {
            self.state = IndexerState::Waiting;
            tracing::debug!(next, head, "Cursor ahead of head");
            let head = self.wait_for_head(next.saturating_sub(1)).await;
            return Ok(Step::Waited { next_ledger: next, head });
        };

        let page = match self.source.fetch_range(range, &self.filters).await {
            Ok(page) => page,
            Err(FetchError::OutOfRange { hint, message, .. }) => {
                return Ok(self.out_of_range(range, hint, &message).await);
            }
            Err(e) => return Err(e.into()),
        };
        if page.latest_ledger > 0 {
            self.rpc_latest = Some(page.latest_ledger);
        }

        let (commit, page) = trim_truncated(range, page);
        let ctx = IndexContext {
            range: commit,
            network: self.config.network.clone(),
            latest_ledger: page.latest_ledger,
        };

        self.state = IndexerState::Dispatching;
        let matched = self.dispatch(&page.events, &ctx).await?;

        let records: Vec<EventRecord> = matched
            .iter()
            .map(|e| EventRecord::from_event(&self.config.network, e))
            .collect();
        let stored = if records.is_empty() {
            0
        } else {
            self.store.insert_events(&records).await?
        };

        self.checkpoint.maybe_save(commit.end).await?;
        self.cursor.advance_past(&commit);
        self.committed = Some(commit.end);

        tracing::info!(
            start = commit.start,
            end = commit.end,
            events = page.events.len(),
            matched = matched.len(),
            stored,
            latest = page.latest_ledger,
            "Range indexed"
        );

        let past_target = self.config.to_ledger.is_some_and(|to| commit.end >= to);
        if page.latest_ledger > 0 && commit.end >= page.latest_ledger && !past_target {
            self.state = IndexerState::Waiting;
            self.wait_for_head(page.latest_ledger).await;
        }

        tokio::time::sleep(Duration::from_millis(self.config.request_spacing_ms)).await;

        Ok(Step::Indexed {
            range: commit,
            total: page.events.len(),
            matched: matched.len(),
            stored,
        })
    }

    async fn out_of_range(&mut self, range: LedgerRange, hint: RangeHint, message: &str) -> Step {
        if range.start > hint.max {
            // ahead of the RPC: its head is behind the ledger-history head
            self.rpc_latest = Some(hint.max);
            self.state = IndexerState::Waiting;
            tracing::debug!(range = %range, rpc_max = hint.max, "RPC behind head");
            tokio::time::sleep(Duration::from_millis(self.config.head_poll_interval_ms)).await;
            return Step::Waited {
                next_ledger: range.start,
                head: hint.max,
            };
        }

        self.state = IndexerState::Repositioning;
        let from = self.cursor.next_ledger;
        let to = self.cursor.reposition(&hint, self.config.chunk_size);
        tracing::warn!(
            from,
            to,
            window_min = hint.min,
            window_max = hint.max,
            rpc_message = %message,
            "Range outside RPC retention, repositioning"
        );
        Step::Repositioned { from, to, hint }
    }

    /// Invoke handlers for every matching event; returns the matched events.
    async fn dispatch<'a>(
        &self,
        events: &'a [DecodedEvent],
        ctx: &IndexContext,
    ) -> Result<Vec<&'a DecodedEvent>, IndexerError> {
        let mode = self.config.dispatch_mode;
        let mut matched = Vec::new();
        let mut jobs: Vec<(&DecodedEvent, HandlerDefinition)> = Vec::new();

        for event in events {
            let defs = self.handlers.matching(event, mode);
            if defs.is_empty() {
                continue;
            }
            matched.push(event);
            jobs.extend(defs.into_iter().map(|d| (event, d.clone())));
        }

        let results: Vec<_> = stream::iter(jobs)
            .map(move |(event, def)| async move {
                let result = def.handler.handle(event, ctx).await;
                (event, def, result)
            })
            .buffer_unordered(self.config.dispatch_concurrency)
            .collect()
            .await;

        for (event, def, result) in results {
            let Err(e) = result else { continue };
            tracing::error!(
                handler = def.handler.name(),
                filter = %def.filter.describe(),
                tx = %event.tx_hash,
                ledger = event.ledger,
                error = %e,
                "Handler failed"
            );
            if self.config.handler_error_policy == HandlerErrorPolicy::RetryRange {
                return Err(match e {
                    e @ IndexerError::Handler { .. } => e,
                    other => IndexerError::handler(def.handler.name(), other),
                });
            }
        }

        Ok(matched)
    }

    async fn flush_checkpoint(&self) {
        let Some(ledger) = self.committed else { return };
        if let Err(e) = self.checkpoint.force_save(ledger).await {
            tracing::warn!(error = %e, ledger, "Final checkpoint failed");
        }
    }

    /// Poll the head until it is strictly above `observed`.
    async fn wait_for_head(&self, observed: u64) -> u64 {
        let interval = Duration::from_millis(self.config.head_poll_interval_ms);
        tracing::debug!(observed, "Waiting for new ledger");
        loop {
            tokio::time::sleep(interval).await;
            match self.head.latest_ledger().await {
                Ok(head) if head > observed => return head,
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Head poll failed"),
            }
        }
    }

    async fn back_off(&mut self, error: IndexerError) -> Result<Step, IndexerError> {
        self.failures += 1;
        let Some(delay) = self.backoff.next_delay(self.failures) else {
            self.state = IndexerState::Error;
            tracing::error!(attempts = self.failures, error = %error, "Retry budget exhausted");
            return Err(IndexerError::Aborted {
                reason: format!("{} consecutive failures, last: {error}", self.failures),
            });
        };

        self.state = IndexerState::BackingOff;
        tracing::warn!(
            attempt = self.failures,
            delay_ms = delay.as_millis() as u64,
            next = self.cursor.next_ledger,
            error = %error,
            "Cycle failed, backing off"
        );
        tokio::time::sleep(delay).await;

        Ok(Step::BackedOff {
            attempt: self.failures,
            delay,
            reason: error.to_string(),
        })
    }
}

/// For a page that hit the pagination limit, commit only the ledgers
/// strictly below the last ledger seen, and drop that ledger's events.
///
/// A full page inside a single ledger is committed as that ledger alone.
fn trim_truncated(range: LedgerRange, mut page: EventPage) -> (LedgerRange, EventPage) {
    if !page.truncated {
        return (range, page);
    }
    let Some(last) = page.last_ledger() else {
        return (range, page);
    };

    if last > range.start {
        page.events.retain(|e| e.ledger < last);
        let commit = LedgerRange {
            start: range.start,
            end: last - 1,
        };
        tracing::warn!(range = %range, committed = %commit, "Page limit reached, committing partial range");
        (commit, page)
    } else {
        tracing::warn!(
            ledger = range.start,
            events = page.events.len(),
            "Page limit reached inside one ledger, later events in it are skipped"
        );
        let commit = LedgerRange {
            start: range.start,
            end: range.start,
        };
        (commit, page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(ledger: u64) -> DecodedEvent {
        DecodedEvent {
            tx_hash: format!("tx{ledger}"),
            contract_id: "C".into(),
            ledger,
            topics: vec![],
            value: serde_json::Value::Null,
            topic_signature: String::new(),
            decode_errors: Default::default(),
        }
    }

    fn page(ledgers: &[u64], truncated: bool) -> EventPage {
        EventPage {
            events: ledgers.iter().copied().map(ev).collect(),
            latest_ledger: 10_000,
            truncated,
            raw_count: ledgers.len(),
        }
    }

    #[test]
    fn untruncated_page_commits_whole_range() {
        let range = LedgerRange { start: 100, end: 199 };
        let (commit, p) = trim_truncated(range, page(&[100, 150], false));
        assert_eq!(commit, range);
        assert_eq!(p.events.len(), 2);
    }

    #[test]
    fn truncated_page_commits_below_last_ledger() {
        let range = LedgerRange { start: 100, end: 199 };
        let (commit, p) = trim_truncated(range, page(&[100, 120, 150, 150], true));
        assert_eq!(commit, LedgerRange { start: 100, end: 149 });
        assert_eq!(p.events.len(), 2);
    }

    #[test]
    fn truncated_single_ledger_commits_that_ledger() {
        let range = LedgerRange { start: 100, end: 199 };
        let (commit, p) = trim_truncated(range, page(&[100, 100], true));
        assert_eq!(commit, LedgerRange { start: 100, end: 100 });
        assert_eq!(p.events.len(), 2);
    }

    #[test]
    fn default_backoff_is_fixed_two_seconds() {
        let policy = backoff_policy(&RetryConfig::default());
        assert_eq!(policy.next_delay(1), Some(Duration::from_secs(2)));
        assert_eq!(policy.next_delay(50), Some(Duration::from_secs(2)));
    }

    #[test]
    fn bounded_backoff_gives_up() {
        let policy = backoff_policy(&RetryConfig {
            max_retries: Some(1),
            ..RetryConfig::default()
        });
        assert!(policy.next_delay(1).is_some());
        assert!(policy.next_delay(2).is_none());
    }
}
