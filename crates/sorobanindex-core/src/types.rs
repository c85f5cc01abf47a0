//! Shared types for the ingestion pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ─── LedgerRange ──────────────────────────────────────────────────────────────

/// An inclusive `[start, end]` span of ledger sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRange {
    pub start: u64,
    pub end: u64,
}

impl LedgerRange {
    /// `[start, min(start + chunk - 1, head)]`, or `None` when `start > head`.
    ///
    /// A `None` means the cursor is ahead of the head and the scheduler
    /// must wait instead of querying.
    pub fn bounded(start: u64, chunk: u64, head: u64) -> Option<Self> {
        let end = start
            .saturating_add(chunk.max(1) - 1)
            .min(head);
        (start <= end).then_some(Self { start, end })
    }
}

impl std::fmt::Display for LedgerRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

// ─── RangeHint ────────────────────────────────────────────────────────────────

/// Retention window `{min, max}` reported by an out-of-range RPC error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeHint {
    pub min: u64,
    pub max: u64,
}

impl RangeHint {
    /// Cursor to jump to so the next chunk ends at the top of the window.
    ///
    /// `max(min, max - chunk + 1)`.
    pub fn reposition_target(&self, chunk: u64) -> u64 {
        self.min
            .max(self.max.saturating_sub(chunk.max(1) - 1))
    }
}

// ─── DecodedEvent ─────────────────────────────────────────────────────────────

/// A contract event whose topics and value have been decoded into JSON-safe form.
///
/// Built once per raw RPC event and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedEvent {
    /// Transaction hash (hex).
    pub tx_hash: String,
    /// Emitting contract (`C…` strkey); empty for system events.
    pub contract_id: String,
    /// Ledger sequence the event was emitted in.
    pub ledger: u64,
    /// Decoded topic segments, in order.
    pub topics: Vec<serde_json::Value>,
    /// Decoded event value.
    pub value: serde_json::Value,
    /// Colon-joined human rendering of the topics, e.g. `TOKEN:mint`.
    pub topic_signature: String,
    /// Segments that failed to decode, keyed `topic[i]` or `value`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub decode_errors: BTreeMap<String, String>,
}

impl DecodedEvent {
    /// Returns `true` if any segment was replaced by a placeholder.
    pub fn has_errors(&self) -> bool {
        !self.decode_errors.is_empty()
    }

    /// Topic at position `i`, if present.
    pub fn topic(&self, i: usize) -> Option<&serde_json::Value> {
        self.topics.get(i)
    }
}

// ─── IndexContext ─────────────────────────────────────────────────────────────

/// Context passed to handlers during dispatch.
#[derive(Debug, Clone)]
pub struct IndexContext {
    /// The ledger range currently being processed.
    pub range: LedgerRange,
    /// Logical network name (e.g. `"stellar-testnet"`).
    pub network: String,
    /// Latest ledger reported by the RPC for this range.
    pub latest_ledger: u64,
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_range_caps_at_chunk() {
        let r = LedgerRange::bounded(100, 200, 10_000).unwrap();
        assert_eq!(r, LedgerRange { start: 100, end: 299 });
    }

    #[test]
    fn bounded_range_caps_at_head() {
        let r = LedgerRange::bounded(100, 200, 150).unwrap();
        assert_eq!(r, LedgerRange { start: 100, end: 150 });
    }

    #[test]
    fn bounded_range_none_when_ahead_of_head() {
        assert!(LedgerRange::bounded(151, 200, 150).is_none());
        assert!(LedgerRange::bounded(150, 200, 150).is_some());
    }

    #[test]
    fn reposition_inside_window() {
        // [100, 299] requested, RPC serves 500-1000, chunk 200
        let hint = RangeHint { min: 500, max: 1000 };
        assert_eq!(hint.reposition_target(200), 801);
    }

    #[test]
    fn reposition_narrow_window_uses_min() {
        let hint = RangeHint { min: 950, max: 1000 };
        assert_eq!(hint.reposition_target(200), 950);
    }

    #[test]
    fn decoded_event_errors_skipped_when_empty() {
        let ev = DecodedEvent {
            tx_hash: "ab".into(),
            contract_id: "C1".into(),
            ledger: 7,
            topics: vec![serde_json::json!("mint")],
            value: serde_json::Value::Null,
            topic_signature: "mint".into(),
            decode_errors: BTreeMap::new(),
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(!json.contains("decode_errors"));
        assert!(!ev.has_errors());
    }
}
