use tokio::sync::broadcast;
use tracing::{debug, info};
use agrimart_core::events::EventSink;
use agrimart_shared::DomainEvent;

/// In-process fan-out of committed domain events. Slow subscribers lag
/// and lose the oldest events rather than blocking publishers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: DomainEvent) {
        let name = event.name();
        let key = event.key();
        match self.sender.send(event) {
            Ok(receivers) => info!("Published {} for {} to {} subscribers", name, key, receivers),
            Err(_) => debug!("No subscribers for {} ({})", name, key),
        }
    }
}
