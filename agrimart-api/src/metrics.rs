use std::sync::Arc;
use axum::{extract::State, http::header, response::IntoResponse};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use agrimart_core::events::EventSink;
use agrimart_shared::DomainEvent;
use agrimart_store::EventBus;

use crate::{error::AppError, state::AppState};

/// Workflow counters, fed from committed domain events
pub struct Metrics {
    registry: Registry,
    orders_placed: IntCounter,
    status_transitions: IntCounterVec,
    complaints_filed: IntCounter,
    claims_decided: IntCounterVec,
    funds_added: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let orders_placed = IntCounter::new("agrimart_orders_placed_total", "Orders placed")?;
        let status_transitions = IntCounterVec::new(
            Opts::new("agrimart_order_transitions_total", "Order status transitions by target status"),
            &["to"],
        )?;
        let complaints_filed = IntCounter::new("agrimart_complaints_filed_total", "Complaints filed")?;
        let claims_decided = IntCounterVec::new(
            Opts::new("agrimart_claims_decided_total", "Insurance claims decided by outcome"),
            &["decision"],
        )?;
        let funds_added = IntCounter::new("agrimart_funds_added_total", "Wallet top-ups")?;

        registry.register(Box::new(orders_placed.clone()))?;
        registry.register(Box::new(status_transitions.clone()))?;
        registry.register(Box::new(complaints_filed.clone()))?;
        registry.register(Box::new(claims_decided.clone()))?;
        registry.register(Box::new(funds_added.clone()))?;

        Ok(Self {
            registry,
            orders_placed,
            status_transitions,
            complaints_filed,
            claims_decided,
            funds_added,
        })
    }

    pub fn observe(&self, event: &DomainEvent) {
        match event {
            DomainEvent::OrderPlaced(_) => self.orders_placed.inc(),
            DomainEvent::OrderStatusChanged(e) => self.status_transitions.with_label_values(&[e.to.as_str()]).inc(),
            DomainEvent::ComplaintFiled(_) => self.complaints_filed.inc(),
            DomainEvent::ClaimDecided(e) => self.claims_decided.with_label_values(&[e.decision.as_str()]).inc(),
            DomainEvent::FundsAdded(_) => self.funds_added.inc(),
            DomainEvent::ComplaintClosed(_) | DomainEvent::ClaimFiled(_) | DomainEvent::PolicyPurchased(_) => {}
        }
    }

    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Event sink handed to the workflows: count, then broadcast
pub struct MeteredEvents {
    bus: EventBus,
    metrics: Arc<Metrics>,
}

impl MeteredEvents {
    pub fn new(bus: EventBus, metrics: Arc<Metrics>) -> Self {
        Self { bus, metrics }
    }
}

impl EventSink for MeteredEvents {
    fn publish(&self, event: DomainEvent) {
        self.metrics.observe(&event);
        self.bus.publish(event);
    }
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state.metrics.render()?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}
