//! Built-in handler table for `sorobanindex run`.
//!
//! Every definition logs the matched event; persistence is done by the
//! scheduler itself.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use sorobanindex_core::{DecodedEvent, EventFilter, EventHandler, IndexContext, IndexerError};
use sorobanindex_stellar::IndexerBuilder;

/// `(handler name, leading topic segments)` for every registered definition.
pub const DEFAULT_TOPICS: &[(&str, [&str; 2])] = &[
    ("mint", ["TEAM_FINANCE_TOKEN", "mint"]),
    ("update_metadata", ["TEAM_FINANCE_TOKEN", "update_metadata"]),
    ("deposit", ["TEAM_FINANCE_LOCKING", "deposit"]),
    ("pool_created", ["TEAM_FINANCE_STAKING", "pool_created"]),
    ("multi_send_token", ["TEAM_FINANCE_MULTISENDER", "multi_send_token"]),
];

/// Logs each event it receives at `info`.
pub struct LoggingHandler {
    name: String,
}

impl LoggingHandler {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl EventHandler for LoggingHandler {
    async fn handle(&self, event: &DecodedEvent, ctx: &IndexContext) -> Result<(), IndexerError> {
        info!(
            handler = %self.name,
            network = %ctx.network,
            ledger = event.ledger,
            contract = %event.contract_id,
            tx = %event.tx_hash,
            signature = %event.topic_signature,
            data = %event.value,
            "event"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// The filters registered for `contract_ids`: unscoped when the list is
/// empty, otherwise one scoped copy per contract.
pub fn default_filters(contract_ids: &[String]) -> Vec<(&'static str, EventFilter)> {
    let mut filters = Vec::new();
    for (name, [namespace, action]) in DEFAULT_TOPICS {
        let base = EventFilter::topics([*namespace, *action, "*", "*"]);
        if contract_ids.is_empty() {
            filters.push((*name, base));
        } else {
            for id in contract_ids {
                filters.push((*name, base.clone().contract(id.clone())));
            }
        }
    }
    filters
}

/// Register the default table on `builder`.
pub fn register_defaults(mut builder: IndexerBuilder, contract_ids: &[String]) -> IndexerBuilder {
    for (name, filter) in default_filters(contract_ids) {
        builder = builder.on(filter, Arc::new(LoggingHandler::new(name)));
    }
    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unscoped_table_has_one_row_per_topic() {
        let filters = default_filters(&[]);
        assert_eq!(filters.len(), DEFAULT_TOPICS.len());
        assert!(filters.iter().all(|(_, f)| f.contract_id.is_none()));
        assert_eq!(filters[0].1.describe(), "TEAM_FINANCE_TOKEN:mint:*:*");
    }

    #[test]
    fn contract_ids_scope_every_row() {
        let ids = vec!["CAAA".to_string(), "CBBB".to_string()];
        let filters = default_filters(&ids);
        assert_eq!(filters.len(), DEFAULT_TOPICS.len() * 2);
        assert_eq!(filters[1].1.describe(), "CBBB/TEAM_FINANCE_TOKEN:mint:*:*");
    }

    #[test]
    fn defaults_build_a_valid_table() {
        let table = register_defaults(IndexerBuilder::new(), &[])
            .build_handlers()
            .unwrap();
        assert_eq!(table.len(), 5);
    }

    #[tokio::test]
    async fn logging_handler_accepts_events() {
        let handler = LoggingHandler::new("mint");
        let event = DecodedEvent {
            tx_hash: "abc".into(),
            contract_id: "CAAA".into(),
            ledger: 7,
            topics: vec![serde_json::json!("TEAM_FINANCE_TOKEN"), serde_json::json!("mint")],
            value: serde_json::json!({"amount": "1"}),
            topic_signature: "TEAM_FINANCE_TOKEN:mint".into(),
            decode_errors: Default::default(),
        };
        let ctx = IndexContext {
            range: sorobanindex_core::LedgerRange { start: 1, end: 10 },
            network: "testnet".into(),
            latest_ledger: 10,
        };
        assert!(handler.handle(&event, &ctx).await.is_ok());
        assert_eq!(handler.name(), "mint");
    }
}
