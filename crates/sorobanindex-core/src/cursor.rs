//! Ingestion cursor: the next ledger sequence to ingest.

use serde::{Deserialize, Serialize};

use crate::checkpoint::Checkpoint;
use crate::types::{LedgerRange, RangeHint};

/// The scheduler's position in the ledger stream.
///
/// The cursor is the durable high-water mark: every ledger below
/// `next_ledger` has been fully dispatched and persisted, or was skipped
/// by an explicit reposition. It only moves through the methods below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Next ledger sequence to fetch.
    pub next_ledger: u64,
}

impl Cursor {
    pub fn new(next_ledger: u64) -> Self {
        Self { next_ledger }
    }

    /// Resume from a saved checkpoint, never going below `start_ledger`.
    pub fn resume(start_ledger: u64, checkpoint: Option<&Checkpoint>) -> Self {
        let next = checkpoint
            .map(|cp| cp.ledger.saturating_add(1))
            .unwrap_or(start_ledger)
            .max(start_ledger);
        Self::new(next)
    }

    /// The next range to fetch, bounded by `chunk` and `head`.
    ///
    /// `None` when the cursor is already past `head`.
    pub fn next_range(&self, chunk: u64, head: u64) -> Option<LedgerRange> {
        LedgerRange::bounded(self.next_ledger, chunk, head)
    }

    /// Mark `range` as fully committed.
    pub fn advance_past(&mut self, range: &LedgerRange) {
        self.next_ledger = self.next_ledger.max(range.end.saturating_add(1));
    }

    /// Jump into the RPC's retention window. Returns the new position.
    pub fn reposition(&mut self, hint: &RangeHint, chunk: u64) -> u64 {
        self.next_ledger = hint.reposition_target(chunk);
        self.next_ledger
    }
}
