#![allow(dead_code)]

use std::sync::Arc;
use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;
use agrimart_catalog::{NewProduct, ProductCategory};
use agrimart_core::complaint::ComplaintReason;
use agrimart_core::insurance::{Insurance, Policy};
use agrimart_core::order::{DeliveryDestination, Order, OrderStatus};
use agrimart_core::{Actor, Clock, ManualClock, Role, Store};
use agrimart_order::{FileComplaint, Marketplace, NewPolicy, PlaceOrder, WorkflowContext};
use agrimart_store::{EventBus, MemoryStore};

/// A marketplace with one user per role and a ₹200 product in stock
pub struct World {
    pub market: Marketplace,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub events: EventBus,
    pub buyer: Actor,
    pub seller: Actor,
    pub logistics: Actor,
    pub coldstorage: Actor,
    pub driver: Actor,
    pub agent: Actor,
    pub product_id: Uuid,
}

impl World {
    pub async fn new(stock: i64) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 6, 1, 6, 30, 0).unwrap()));
        let events = EventBus::new(64);
        let ctx = WorkflowContext::new(store.clone())
            .with_clock(clock.clone())
            .with_events(Arc::new(events.clone()));
        let market = Marketplace::new(ctx);

        let mut actors = Vec::new();
        for (role, name, email) in [
            (Role::Buyer, "Meera", "meera@example.in"),
            (Role::Seller, "Ravi", "ravi@farm.in"),
            (Role::Logistics, "Swift Haul", "ops@swifthaul.in"),
            (Role::Coldstorage, "FrostBox", "dock@frostbox.in"),
            (Role::Driver, "Sunil", "sunil@swifthaul.in"),
            (Role::Insurance, "Vikram", "vikram@kisancover.in"),
        ] {
            actors.push(market.users.register(name, email, role, None).await.unwrap().actor());
        }

        let product = market
            .catalog
            .create_product(
                &actors[1],
                NewProduct {
                    name: "Organic Wheat".to_string(),
                    category: ProductCategory::Grains,
                    unit: "quintal".to_string(),
                    price: 200,
                    stock,
                },
            )
            .await
            .unwrap();

        Self {
            market,
            store,
            clock,
            events,
            buyer: actors[0],
            seller: actors[1],
            logistics: actors[2],
            coldstorage: actors[3],
            driver: actors[4],
            agent: actors[5],
            product_id: product.id,
        }
    }

    pub fn checkout(&self, quantity: i64, destination: DeliveryDestination) -> PlaceOrder {
        PlaceOrder { product_id: self.product_id, quantity, delivery_destination: destination }
    }

    pub async fn balance(&self, actor: &Actor) -> i64 {
        self.market.accounts.get_balance(actor.user_id).await.unwrap()
    }

    pub async fn ledger_sum(&self, actor: &Actor) -> i64 {
        self.market
            .accounts
            .get_transactions(actor.user_id)
            .await
            .unwrap()
            .iter()
            .map(|t| t.amount)
            .sum()
    }

    pub async fn advance(&self, actor: &Actor, order_id: Uuid, to: OrderStatus) -> Order {
        self.market.orders.advance_status(actor, order_id, to).await.unwrap()
    }

    /// Buy `quantity` and hand it to the driver
    pub async fn out_for_delivery(&self, quantity: i64) -> Order {
        let order = self
            .market
            .orders
            .place_order(&self.buyer, self.checkout(quantity, DeliveryDestination::Customer))
            .await
            .unwrap();
        self.advance(&self.seller, order.id, OrderStatus::Confirmed).await;
        self.advance(&self.seller, order.id, OrderStatus::DispatchedToLogistics).await;
        self.advance(&self.logistics, order.id, OrderStatus::DispatchedToCustomer).await
    }

    pub fn complaint(&self, order_id: Uuid, reason: ComplaintReason) -> FileComplaint {
        FileComplaint { order_id, reason, description: "Grain damp and mouldy".to_string() }
    }

    pub async fn publish_policy(&self, premium: i64, coverage: i64, duration_days: i64) -> Uuid {
        self.market
            .policies
            .create_policy(
                &self.agent,
                NewPolicy { name: "Kisan Transit Shield".to_string(), premium, coverage, duration_days },
            )
            .await
            .unwrap()
            .id
    }

    /// Write a holding for the seller that only starts `starts_in` from now.
    /// Purchases always start immediately, so this goes straight to the store.
    pub async fn future_holding(&self, policy_id: Uuid, starts_in: Duration) -> Insurance {
        let seller = self.market.users.get_user(self.seller.user_id).await.unwrap();
        let agent = self.market.users.get_user(self.agent.user_id).await.unwrap();
        let mut tx = self.store.begin().await.unwrap();
        let policy: Policy = tx.get_policy(policy_id).await.unwrap().unwrap();
        let start = self.clock.now() + starts_in;
        let holding = Insurance::issue(&seller, &policy, Some(&agent), start);
        tx.put_insurance(&holding).await.unwrap();
        tx.commit().await.unwrap();
        holding
    }
}
