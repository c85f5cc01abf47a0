//! Positional topic filters and the client-side match engine.
//!
//! The server-side filter built from these is advisory: RPC nodes have been
//! seen returning broader result sets than requested, so every decoded event
//! is re-checked here before it reaches a handler.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::IndexerError;
use crate::types::DecodedEvent;

/// Maximum number of topic positions a contract event (and a filter) can carry.
pub const MAX_TOPICS: usize = 4;

/// Type prefixes understood in `kind:value` topic segments.
pub const SEGMENT_KINDS: &[&str] = &["sym", "str", "addr", "u32", "u64", "i128", "bytes"];

const WILDCARD: &str = "*";

// ─── TopicMatcher ─────────────────────────────────────────────────────────────

/// One position of a topic filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TopicMatcher {
    /// `*`: matches any value at this position.
    Any,
    /// A human segment, optionally `kind:value` typed (e.g. `u32:5`).
    Exact(String),
}

impl TopicMatcher {
    pub fn parse(segment: &str) -> Self {
        if segment == WILDCARD {
            Self::Any
        } else {
            Self::Exact(segment.to_string())
        }
    }

    /// The segment as written, `*` for the wildcard.
    pub fn segment(&self) -> &str {
        match self {
            Self::Any => WILDCARD,
            Self::Exact(s) => s,
        }
    }

    /// The rendered topic value this matcher accepts, `None` for the wildcard.
    ///
    /// A recognised `kind:` prefix is stripped so `sym:mint` expects `mint`.
    /// Byte literals are normalised to the lowercase `0x…` form the codec renders.
    ///
    /// Symbols and strings both render as plain JSON strings, so on the client
    /// side `sym:mint` and `str:mint` accept the same topics. The type is only
    /// enforced by the encoded filter sent to the RPC.
    pub fn expected(&self) -> Option<Cow<'_, str>> {
        let Self::Exact(segment) = self else {
            return None;
        };
        let Some((kind, value)) = segment.split_once(':') else {
            return Some(Cow::Borrowed(segment));
        };
        if !SEGMENT_KINDS.contains(&kind) {
            return Some(Cow::Borrowed(segment));
        }
        if kind == "bytes" {
            let hex = value.strip_prefix("0x").unwrap_or(value);
            return Some(Cow::Owned(format!("0x{}", hex.to_ascii_lowercase())));
        }
        Some(Cow::Borrowed(value))
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Any)
    }
}

impl From<String> for TopicMatcher {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<TopicMatcher> for String {
    fn from(m: TopicMatcher) -> Self {
        m.segment().to_string()
    }
}

// ─── EventFilter ─────────────────────────────────────────────────────────────

/// Which events a handler wants: optional contract scope plus up to four
/// positional topic matchers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Only events emitted by this contract (`None` = any contract).
    pub contract_id: Option<String>,
    /// Positional matchers; positions past the end are unconstrained.
    pub topics: Vec<TopicMatcher>,
}

impl EventFilter {
    /// Build a filter from human segments, e.g. `["TOKEN", "mint", "*", "*"]`.
    pub fn topics<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            contract_id: None,
            topics: segments
                .into_iter()
                .map(|s| TopicMatcher::parse(s.as_ref()))
                .collect(),
        }
    }

    /// Restrict the filter to a single contract.
    pub fn contract(mut self, contract_id: impl Into<String>) -> Self {
        self.contract_id = Some(contract_id.into());
        self
    }

    /// Reject filters that cannot be expressed to the RPC.
    pub fn validate(&self) -> Result<(), IndexerError> {
        if self.topics.len() > MAX_TOPICS {
            return Err(IndexerError::Config(format!(
                "topic filter has {} positions, at most {MAX_TOPICS} allowed",
                self.topics.len()
            )));
        }
        Ok(())
    }

    /// Client-side match.
    ///
    /// A set contract scope must equal the event's contract id. Each filter
    /// position is then compared with the event topic at the same position:
    /// the wildcard always matches, a literal matches only if the rendered
    /// topic equals it exactly (case-sensitive). A literal past the end of
    /// the event's topics never matches.
    pub fn matches(&self, event: &DecodedEvent) -> bool {
        if let Some(scope) = &self.contract_id {
            if scope != &event.contract_id {
                return false;
            }
        }
        self.topics.iter().enumerate().all(|(i, matcher)| {
            let Some(expected) = matcher.expected() else {
                return true;
            };
            match event.topic(i) {
                Some(topic) => render_topic(topic) == expected,
                None => false,
            }
        })
    }

    /// Human rendering, e.g. `C…/TOKEN:mint:*:*`.
    pub fn describe(&self) -> String {
        let topics: Vec<_> = self.topics.iter().map(TopicMatcher::segment).collect();
        match &self.contract_id {
            Some(c) => format!("{c}/{}", topics.join(":")),
            None => topics.join(":"),
        }
    }
}

/// Render a JSON-safe topic the way literals are written.
///
/// Strings pass through (symbols, strings, addresses, hex bytes and big
/// integers are all strings after the JSON-safe projection), void renders
/// empty, and everything else uses its compact JSON form.
pub fn render_topic(topic: &serde_json::Value) -> Cow<'_, str> {
    match topic {
        serde_json::Value::String(s) => Cow::Borrowed(s),
        serde_json::Value::Null => Cow::Borrowed(""),
        other => Cow::Owned(other.to_string()),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
