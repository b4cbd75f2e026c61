use std::sync::Arc;
use chrono::{DateTime, Duration, Utc};
use agrimart_core::events::{EventSink, NoopEventSink};
use agrimart_core::{Clock, CoreResult, Store, StoreTx, SystemClock};
use agrimart_shared::DomainEvent;

/// Tunable business rules
#[derive(Debug, Clone, Copy)]
pub struct WorkflowRules {
    /// How long after dispatch to the customer a complaint may be filed
    pub complaint_window: Duration,
}

impl Default for WorkflowRules {
    fn default() -> Self {
        Self { complaint_window: Duration::hours(24) }
    }
}

/// Everything a workflow service needs: storage, time, events, rules
#[derive(Clone)]
pub struct WorkflowContext {
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub events: Arc<dyn EventSink>,
    pub rules: WorkflowRules,
}

impl WorkflowContext {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            events: Arc::new(NoopEventSink),
            rules: WorkflowRules::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_rules(mut self, rules: WorkflowRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn begin(&self) -> CoreResult<Box<dyn StoreTx>> {
        self.store.begin().await
    }

    pub fn publish(&self, event: DomainEvent) {
        self.events.publish(event);
    }
}
