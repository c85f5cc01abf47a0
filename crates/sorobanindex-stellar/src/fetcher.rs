//! Ranged `getEvents` fetcher for Soroban RPC.
//!
//! One request per ledger range. The response is decoded into
//! [`DecodedEvent`]s; an out-of-range failure is surfaced as a tagged
//! [`FetchError::OutOfRange`] carrying the RPC's retention window so the
//! scheduler never has to parse error text itself.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use sorobanindex_codec::decode_segment;
use sorobanindex_core::{DecodedEvent, IndexerError, LedgerRange, RangeHint};
use sorobanindex_rpc::{JsonRpcRequest, RpcTransport, TransportError};

use crate::filters::FilterSet;

// ─── Wire types ───────────────────────────────────────────────────────────────

/// A raw event as returned by `getEvents` with `xdrFormat: "base64"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(deserialize_with = "lenient_u64")]
    pub ledger: u64,
    #[serde(rename = "ledgerClosedAt", default)]
    pub ledger_closed_at: Option<String>,
    #[serde(rename = "contractId", default)]
    pub contract_id: String,
    #[serde(rename = "txHash", default)]
    pub tx_hash: String,
    /// Base64 XDR topics. Older RPC versions name the field `topic`.
    #[serde(alias = "topic", default)]
    pub topics: Vec<String>,
    /// Either a base64 string or `{"xdr": "…"}`.
    #[serde(default)]
    pub value: Value,
}

impl RawEvent {
    /// Base64 XDR of the event value, whichever shape the RPC used.
    pub fn value_xdr(&self) -> Option<&str> {
        match &self.value {
            Value::String(s) => Some(s),
            Value::Object(o) => o.get("xdr").and_then(Value::as_str),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GetEventsResult {
    #[serde(default)]
    events: Vec<RawEvent>,
    #[serde(rename = "latestLedger", default, deserialize_with = "lenient_u64")]
    latest_ledger: u64,
}

/// Accept a ledger number written as a JSON number or a decimal string.
pub(crate) fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    use serde::de::Error;
    match Value::deserialize(d)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("not a ledger sequence: {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("not a ledger sequence: {s:?}"))),
        Value::Null => Ok(0),
        other => Err(D::Error::custom(format!("not a ledger sequence: {other}"))),
    }
}

// ─── EventPage / FetchError ───────────────────────────────────────────────────

/// The decoded result of one range request.
#[derive(Debug, Clone, Default)]
pub struct EventPage {
    pub events: Vec<DecodedEvent>,
    /// RPC head at response time; `0` when the response omitted it.
    pub latest_ledger: u64,
    /// The page hit `pagination.limit`, so later events may be missing.
    pub truncated: bool,
    /// Events in the raw response.
    pub raw_count: usize,
}

impl EventPage {
    /// Highest ledger carried by any event in the page.
    pub fn last_ledger(&self) -> Option<u64> {
        self.events.iter().map(|e| e.ledger).max()
    }
}

/// Tagged failure of a range request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The requested range lies outside the RPC's retention window.
    #[error("ledger range out of retention window {}-{}: {message}", .hint.min, .hint.max)]
    OutOfRange {
        code: i64,
        hint: RangeHint,
        message: String,
    },

    /// Any other well-formed RPC error.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed getEvents response: {0}")]
    MalformedResponse(String),
}

impl From<TransportError> for FetchError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Rpc(err) => match parse_range_hint(&err.message) {
                Some(hint) => Self::OutOfRange {
                    code: err.code,
                    hint,
                    message: err.message,
                },
                None => Self::Rpc {
                    code: err.code,
                    message: err.message,
                },
            },
            TransportError::Deserialization(e) => Self::MalformedResponse(e.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<FetchError> for IndexerError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::OutOfRange { code, message, .. } | FetchError::Rpc { code, message } => {
                IndexerError::Rpc { code, message }
            }
            FetchError::Transport(msg) => IndexerError::Transport(msg),
            FetchError::MalformedResponse(msg) => IndexerError::Decode(msg),
        }
    }
}

/// Extract `ledger range: <min> - <max>` (case-insensitive) from an RPC message.
pub fn parse_range_hint(message: &str) -> Option<RangeHint> {
    const NEEDLE: &str = "ledger range:";
    let at = message.to_ascii_lowercase().find(NEEDLE)?;
    let rest = message[at + NEEDLE.len()..].trim_start();

    let (min, rest) = leading_number(rest)?;
    let rest = rest.trim_start().strip_prefix('-')?.trim_start();
    let (max, _) = leading_number(rest)?;
    Some(RangeHint { min, max })
}

fn leading_number(s: &str) -> Option<(u64, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let n = s[..end].parse().ok()?;
    Some((n, &s[end..]))
}

// ─── Decoding ─────────────────────────────────────────────────────────────────

/// Decode a raw event. Undecodable segments become placeholders and are
/// recorded in `decode_errors`; the event itself is never dropped.
pub fn decode_event(raw: &RawEvent) -> DecodedEvent {
    let mut decode_errors = std::collections::BTreeMap::new();
    let mut topics = Vec::with_capacity(raw.topics.len());
    let mut pieces = Vec::with_capacity(raw.topics.len());

    for (i, b64) in raw.topics.iter().enumerate() {
        let seg = decode_segment(b64);
        if let Some(err) = &seg.error {
            decode_errors.insert(format!("topic[{i}]"), err.to_string());
        }
        topics.push(seg.json);
        pieces.push(seg.piece);
    }

    let value = match raw.value_xdr() {
        Some(b64) => {
            let seg = decode_segment(b64);
            if let Some(err) = seg.error {
                decode_errors.insert("value".into(), err.to_string());
            }
            seg.json
        }
        None => Value::Null,
    };

    DecodedEvent {
        tx_hash: raw.tx_hash.clone(),
        contract_id: raw.contract_id.clone(),
        ledger: raw.ledger,
        topics,
        value,
        topic_signature: pieces.join(":"),
        decode_errors,
    }
}

// ─── EventSource ──────────────────────────────────────────────────────────────

/// Anything that can return the decoded events of a ledger range.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_range(
        &self,
        range: LedgerRange,
        filters: &FilterSet,
    ) -> Result<EventPage, FetchError>;
}

#[async_trait]
impl<T: EventSource + ?Sized> EventSource for std::sync::Arc<T> {
    async fn fetch_range(
        &self,
        range: LedgerRange,
        filters: &FilterSet,
    ) -> Result<EventPage, FetchError> {
        (**self).fetch_range(range, filters).await
    }
}

/// Event counts for a range under progressively looser filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProbeReport {
    pub exact: usize,
    pub wildcard_topics: usize,
    pub unfiltered: usize,
}

/// `getEvents` over any [`RpcTransport`].
pub struct SorobanEventFetcher<T: RpcTransport> {
    transport: T,
    page_limit: u32,
    next_id: AtomicU64,
}

impl<T: RpcTransport> SorobanEventFetcher<T> {
    pub fn new(transport: T, page_limit: u32) -> Self {
        Self {
            transport,
            page_limit: page_limit.max(1),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// `getEvents` parameters for `range`. `endLedger` is exclusive on the wire.
    pub fn request_params(&self, range: LedgerRange, filters: &FilterSet) -> Value {
        json!({
            "startLedger": range.start,
            "endLedger": range.end + 1,
            "filters": filters,
            "pagination": { "limit": self.page_limit },
            "xdrFormat": "base64",
        })
    }

    /// Fetch `range` three times: with `filters`, with every topic
    /// wildcarded, and with no filters at all.
    pub async fn probe_range(
        &self,
        range: LedgerRange,
        filters: &FilterSet,
    ) -> Result<ProbeReport, FetchError> {
        let exact = self.fetch_range(range, filters).await?.raw_count;
        let wildcard_topics = self
            .fetch_range(range, &filters.wildcard_topics())
            .await?
            .raw_count;
        let unfiltered = self.fetch_range(range, &FilterSet::empty()).await?.raw_count;
        Ok(ProbeReport {
            exact,
            wildcard_topics,
            unfiltered,
        })
    }
}

#[async_trait]
impl<T: RpcTransport> EventSource for SorobanEventFetcher<T> {
    async fn fetch_range(
        &self,
        range: LedgerRange,
        filters: &FilterSet,
    ) -> Result<EventPage, FetchError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let req = JsonRpcRequest::new(id, "getEvents", self.request_params(range, filters));

        let resp = self.transport.send(req).await?;
        let result = resp.into_result().map_err(TransportError::Rpc)?;
        let parsed: GetEventsResult = serde_json::from_value(result)
            .map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

        let raw_count = parsed.events.len();
        let events: Vec<DecodedEvent> = parsed.events.iter().map(decode_event).collect();

        let undecodable = events.iter().filter(|e| e.has_errors()).count();
        if undecodable > 0 {
            tracing::warn!(range = %range, undecodable, "events with undecodable segments");
        }
        tracing::debug!(
            range = %range,
            events = raw_count,
            latest_ledger = parsed.latest_ledger,
            "getEvents"
        );

        Ok(EventPage {
            events,
            latest_ledger: parsed.latest_ledger,
            truncated: raw_count >= self.page_limit as usize,
            raw_count,
        })
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
