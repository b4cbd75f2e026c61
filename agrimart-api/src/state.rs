use std::sync::Arc;
use agrimart_core::Store;
use agrimart_order::{Marketplace, WorkflowContext, WorkflowRules};
use agrimart_store::app_config::BusinessRules;
use agrimart_store::EventBus;

use crate::metrics::{MeteredEvents, Metrics};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub market: Marketplace,
    pub events: EventBus,
    pub metrics: Arc<Metrics>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, auth: AuthConfig, business_rules: BusinessRules) -> anyhow::Result<Self> {
        if business_rules.complaint_window_hours <= 0 {
            anyhow::bail!(
                "business_rules.complaint_window_hours must be positive, got {}",
                business_rules.complaint_window_hours
            );
        }

        let events = EventBus::new(256);
        let metrics = Arc::new(Metrics::new()?);
        let rules = WorkflowRules {
            complaint_window: chrono::Duration::hours(business_rules.complaint_window_hours),
        };
        let ctx = WorkflowContext::new(store)
            .with_events(Arc::new(MeteredEvents::new(events.clone(), metrics.clone())))
            .with_rules(rules);

        Ok(Self {
            market: Marketplace::new(ctx),
            events,
            metrics,
            auth,
            business_rules,
        })
    }
}
