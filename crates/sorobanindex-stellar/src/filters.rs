//! Server-side `getEvents` filters built from the handler table.
//!
//! Every registered handler contributes one topic row. Rows are grouped by
//! contract scope in first-seen order, so handlers sharing a scope share a
//! single RPC filter entry.

use serde::Serialize;

use sorobanindex_codec::{encode_topics, TopicSegment};
use sorobanindex_core::{EventFilter, HandlerTable, IndexerError, MAX_TOPICS};

const WILDCARD: &str = "*";

/// One entry of the `filters` array sent with `getEvents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpcEventFilter {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "contractIds", skip_serializing_if = "Vec::is_empty")]
    pub contract_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<Vec<String>>,
}

impl RpcEventFilter {
    fn contract(contract_ids: Vec<String>) -> Self {
        Self {
            kind: "contract".into(),
            contract_ids,
            topics: Vec::new(),
        }
    }
}

/// The full `filters` parameter. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FilterSet {
    filters: Vec<RpcEventFilter>,
}

impl FilterSet {
    /// No filters at all: the RPC returns every event in range.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn filters(&self) -> &[RpcEventFilter] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Total topic rows across all entries.
    pub fn row_count(&self) -> usize {
        self.filters.iter().map(|f| f.topics.len()).sum()
    }

    /// Same contract scopes, every topic position wildcarded.
    ///
    /// Used by the probe diagnostic to tell a topic mismatch apart from an
    /// empty range.
    pub fn wildcard_topics(&self) -> Self {
        let filters = self
            .filters
            .iter()
            .map(|f| RpcEventFilter {
                topics: vec![vec![WILDCARD.to_string(); MAX_TOPICS]],
                ..f.clone()
            })
            .collect();
        Self { filters }
    }
}

/// Encode one filter into its padded, base64-encoded topic row.
pub fn encode_row(filter: &EventFilter) -> Result<Vec<String>, IndexerError> {
    let mut segments: Vec<&str> = filter.topics.iter().map(|m| m.segment()).collect();
    segments.resize(MAX_TOPICS.max(segments.len()), WILDCARD);
    let encoded = encode_topics(&segments).map_err(|e| {
        IndexerError::Encoding(format!("filter {}: {e}", filter.describe()))
    })?;
    Ok(encoded.into_iter().map(TopicSegment::into_string).collect())
}

/// Build the `getEvents` filter set for every definition in `table`.
pub fn encode_filter_set(table: &HandlerTable) -> Result<FilterSet, IndexerError> {
    let mut filters: Vec<(Option<&str>, RpcEventFilter)> = Vec::new();

    for def in table.definitions() {
        let row = encode_row(&def.filter)?;
        let scope = def.filter.contract_id.as_deref();

        match filters.iter_mut().find(|(s, _)| *s == scope) {
            Some((_, entry)) => {
                if !entry.topics.contains(&row) {
                    entry.topics.push(row);
                }
            }
            None => {
                let ids = scope.map(|s| vec![s.to_string()]).unwrap_or_default();
                let mut entry = RpcEventFilter::contract(ids);
                entry.topics.push(row);
                filters.push((scope, entry));
            }
        }
    }

    Ok(FilterSet {
        filters: filters.into_iter().map(|(_, f)| f).collect(),
    })
}
