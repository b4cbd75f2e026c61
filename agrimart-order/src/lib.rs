pub mod context;
pub mod finance;
pub mod transitions;
pub mod manager;
pub mod complaints;
pub mod claims;
pub mod policies;
pub mod directory;
pub mod credentials;
pub mod catalog;

#[cfg(test)]
mod testing;

pub use context::{WorkflowContext, WorkflowRules};
pub use manager::{OrderManager, PlaceOrder};
pub use complaints::{ComplaintRouter, FileComplaint};
pub use claims::ClaimRouter;
pub use policies::{NewPolicy, PolicyDesk};
pub use directory::UserDirectory;
pub use catalog::CatalogService;
pub use finance::{AccountService, BalanceAudit};

use std::sync::Arc;
use chrono::{DateTime, Utc};
use agrimart_core::Clock;

/// All marketplace workflows over one shared context
#[derive(Clone)]
pub struct Marketplace {
    pub users: UserDirectory,
    pub catalog: CatalogService,
    pub orders: OrderManager,
    pub complaints: ComplaintRouter,
    pub claims: ClaimRouter,
    pub policies: PolicyDesk,
    pub accounts: AccountService,
    clock: Arc<dyn Clock>,
}

impl Marketplace {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self {
            clock: ctx.clock.clone(),
            users: UserDirectory::new(ctx.clone()),
            catalog: CatalogService::new(ctx.clone()),
            orders: OrderManager::new(ctx.clone()),
            complaints: ComplaintRouter::new(ctx.clone()),
            claims: ClaimRouter::new(ctx.clone()),
            policies: PolicyDesk::new(ctx.clone()),
            accounts: AccountService::new(ctx),
        }
    }

    /// The marketplace clock, for callers that evaluate time-bound state
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
