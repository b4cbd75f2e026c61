use agrimart_shared::DomainEvent;

/// Outbound hook for committed domain events
pub trait EventSink: Send + Sync {
    fn publish(&self, event: DomainEvent);
}

/// Drops everything. For callers that have nobody listening.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn publish(&self, event: DomainEvent) {
        tracing::trace!(event = event.name(), "No event sink configured");
    }
}
