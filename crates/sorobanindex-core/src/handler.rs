//! Event handler trait and the ordered handler table.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::IndexerError;
use crate::filter::EventFilter;
use crate::indexer::DispatchMode;
use crate::types::{DecodedEvent, IndexContext};

/// Trait for user-provided event handlers.
///
/// A handler may be invoked more than once for the same event (a range is
/// retried as a whole), so its writes must be keyed and idempotent.
/// Recoverable business conditions should be logged and swallowed; a
/// returned error is reported to the scheduler's handler error policy.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Called for each decoded event routed to this handler.
    async fn handle(&self, event: &DecodedEvent, ctx: &IndexContext) -> Result<(), IndexerError>;

    /// Name used in logs and errors.
    fn name(&self) -> &str;
}

/// A filter paired with the handler it routes to.
#[derive(Clone)]
pub struct HandlerDefinition {
    pub filter: EventFilter,
    pub handler: Arc<dyn EventHandler>,
}

impl HandlerDefinition {
    pub fn new(filter: EventFilter, handler: Arc<dyn EventHandler>) -> Self {
        Self { filter, handler }
    }

    pub fn matches(&self, event: &DecodedEvent) -> bool {
        self.filter.matches(event)
    }
}

impl std::fmt::Debug for HandlerDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerDefinition")
            .field("filter", &self.filter.describe())
            .field("handler", &self.handler.name())
            .finish()
    }
}

/// Ordered, immutable registry of handler definitions.
///
/// Built once at startup and shared by reference with the scheduler.
/// Registration order is significant under [`DispatchMode::FirstMatch`].
#[derive(Debug, Clone, Default)]
pub struct HandlerTable {
    definitions: Vec<HandlerDefinition>,
}

impl HandlerTable {
    pub fn builder() -> HandlerTableBuilder {
        HandlerTableBuilder::default()
    }

    pub fn definitions(&self) -> &[HandlerDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// The first definition (in registration order) matching `event`.
    pub fn first_match(&self, event: &DecodedEvent) -> Option<&HandlerDefinition> {
        self.definitions.iter().find(|d| d.matches(event))
    }

    /// Definitions that should receive `event` under `mode`.
    pub fn matching(&self, event: &DecodedEvent, mode: DispatchMode) -> Vec<&HandlerDefinition> {
        match mode {
            DispatchMode::FirstMatch => self.first_match(event).into_iter().collect(),
            DispatchMode::AllMatches => {
                self.definitions.iter().filter(|d| d.matches(event)).collect()
            }
        }
    }
}

/// Builder for [`HandlerTable`]; filters are validated on `build`.
#[derive(Default)]
pub struct HandlerTableBuilder {
    definitions: Vec<HandlerDefinition>,
}

impl HandlerTableBuilder {
    /// Register `handler` for events matching `filter`.
    pub fn on(mut self, filter: EventFilter, handler: Arc<dyn EventHandler>) -> Self {
        self.definitions.push(HandlerDefinition::new(filter, handler));
        self
    }

    pub fn build(self) -> Result<HandlerTable, IndexerError> {
        for def in &self.definitions {
            def.filter.validate()?;
        }
        Ok(HandlerTable {
            definitions: self.definitions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LedgerRange;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Counter(Arc<AtomicU32>, String);

    #[async_trait]
    impl EventHandler for Counter {
        async fn handle(&self, _e: &DecodedEvent, _c: &IndexContext) -> Result<(), IndexerError> {
            self.0.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
        fn name(&self) -> &str {
            &self.1
        }
    }

    fn counter(name: &str) -> (Arc<AtomicU32>, Arc<dyn EventHandler>) {
        let count = Arc::new(AtomicU32::new(0));
        (count.clone(), Arc::new(Counter(count, name.into())))
    }

    fn mint_event() -> DecodedEvent {
        DecodedEvent {
            tx_hash: "ab".into(),
            contract_id: "C1".into(),
            ledger: 10,
            topics: vec![json!("TOKEN"), json!("mint")],
            value: json!("100"),
            topic_signature: "TOKEN:mint".into(),
            decode_errors: BTreeMap::new(),
        }
    }

    fn ctx() -> IndexContext {
        IndexContext {
            range: LedgerRange { start: 1, end: 100 },
            network: "testnet".into(),
            latest_ledger: 200,
        }
    }

    #[test]
    fn first_match_respects_registration_order() {
        let (_, a) = counter("specific");
        let (_, b) = counter("catch-all");
        let table = HandlerTable::builder()
            .on(EventFilter::topics(["TOKEN", "mint"]), a)
            .on(EventFilter::topics(["TOKEN", "*"]), b)
            .build()
            .unwrap();

        let hit = table.first_match(&mint_event()).unwrap();
        assert_eq!(hit.handler.name(), "specific");
        assert_eq!(table.matching(&mint_event(), DispatchMode::FirstMatch).len(), 1);
        assert_eq!(table.matching(&mint_event(), DispatchMode::AllMatches).len(), 2);
    }

    #[test]
    fn no_match_yields_nothing() {
        let (_, a) = counter("burn");
        let table = HandlerTable::builder()
            .on(EventFilter::topics(["TOKEN", "burn"]), a)
            .build()
            .unwrap();
        assert!(table.first_match(&mint_event()).is_none());
        assert!(table.matching(&mint_event(), DispatchMode::AllMatches).is_empty());
    }

    #[test]
    fn build_rejects_oversized_filter() {
        let (_, a) = counter("x");
        let err = HandlerTable::builder()
            .on(EventFilter::topics(["a", "b", "c", "d", "e"]), a)
            .build()
            .unwrap_err();
        assert!(matches!(err, IndexerError::Config(_)));
    }

    #[tokio::test]
    async fn matched_handler_is_invoked() {
        let (count, a) = counter("mint");
        let table = HandlerTable::builder()
            .on(EventFilter::topics(["TOKEN", "mint"]), a)
            .build()
            .unwrap();

        let event = mint_event();
        for def in table.matching(&event, DispatchMode::FirstMatch) {
            def.handler.handle(&event, &ctx()).await.unwrap();
        }
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }
}
