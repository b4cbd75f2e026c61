use serde::Deserialize;
use uuid::Uuid;
use agrimart_catalog::InventoryManager;
use agrimart_core::ledger::TransactionKind;
use agrimart_core::order::{DeliveryDestination, Order, OrderStatus};
use agrimart_core::repository::OrderQuery;
use agrimart_core::{Actor, CoreError, CoreResult, Role};
use agrimart_shared::models::events::{DomainEvent, OrderPlacedEvent, OrderStatusChangedEvent};

use crate::context::WorkflowContext;
use crate::finance::{self, Posting};
use crate::transitions;

/// Checkout request
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrder {
    pub product_id: Uuid,
    pub quantity: i64,
    #[serde(default)]
    pub delivery_destination: DeliveryDestination,
}

/// Manages order lifecycle and state transitions
#[derive(Clone)]
pub struct OrderManager {
    ctx: WorkflowContext,
}

impl OrderManager {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self { ctx }
    }

    /// Checkout: take stock, debit the buyer, credit the seller, open the order
    pub async fn place_order(&self, actor: &Actor, request: PlaceOrder) -> CoreResult<Order> {
        actor.require_role(Role::Buyer)?;
        let now = self.ctx.now();
        let mut tx = self.ctx.begin().await?;

        let mut product = tx
            .get_product(request.product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("product", request.product_id))?;

        let order = Order::place(actor.user_id, &product, request.quantity, request.delivery_destination, now)?;
        InventoryManager::reserve(&mut product, order.quantity, now)?;
        tx.put_product(&product).await?;

        let description = format!("{} x {} {}", order.quantity, order.product_name, product.unit);
        finance::lock_accounts(tx.as_mut(), &[order.buyer_id, order.seller_id], now).await?;
        finance::debit(
            tx.as_mut(),
            Posting::new(order.buyer_id, TransactionKind::ProductPurchase, order.total, order.id, format!("Purchase: {}", description)),
            now,
        )
        .await?;
        finance::credit(
            tx.as_mut(),
            Posting::new(order.seller_id, TransactionKind::SaleCredit, order.total, order.id, format!("Sale: {}", description)),
            now,
        )
        .await?;

        tx.insert_order(&order).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            buyer_id = %order.buyer_id,
            seller_id = %order.seller_id,
            total = order.total,
            "Order placed"
        );
        self.ctx.publish(DomainEvent::OrderPlaced(OrderPlacedEvent {
            order_id: order.id,
            buyer_id: order.buyer_id,
            seller_id: order.seller_id,
            total: order.total,
            timestamp: now,
        }));
        Ok(order)
    }

    /// Pending orders only. Reverses both ledger entries and restores stock.
    pub async fn cancel_order(&self, actor: &Actor, order_id: Uuid) -> CoreResult<Order> {
        let now = self.ctx.now();
        let mut tx = self.ctx.begin().await?;
        let mut order = self.load(tx.as_mut(), order_id).await?;

        if !actor.is_admin() {
            actor.require_owner(Role::Buyer, order.buyer_id)?;
        }

        let guard = order.guard();
        order.transition(OrderStatus::Cancelled, actor.user_id, now)?;

        match tx.get_product(order.product_id).await? {
            Some(mut product) => {
                InventoryManager::release(&mut product, order.quantity, now)?;
                tx.put_product(&product).await?;
            }
            None => tracing::warn!(order_id = %order.id, product_id = %order.product_id, "Product gone, stock not restored"),
        }

        finance::lock_accounts(tx.as_mut(), &[order.buyer_id, order.seller_id], now).await?;
        finance::credit(
            tx.as_mut(),
            Posting::new(order.buyer_id, TransactionKind::OrderRefund, order.total, order.id, format!("Refund: order {} cancelled", order.id)),
            now,
        )
        .await?;
        finance::reverse(
            tx.as_mut(),
            Posting::new(order.seller_id, TransactionKind::SaleReversal, order.total, order.id, format!("Reversal: order {} cancelled", order.id)),
            now,
        )
        .await?;

        if !tx.update_order(&order, guard).await? {
            return Err(CoreError::transition(guard.status, OrderStatus::Cancelled));
        }
        tx.commit().await?;

        self.announce(&order, guard.status, actor, now);
        Ok(order)
    }

    /// Move an order one step along the adjacency table
    pub async fn advance_status(&self, actor: &Actor, order_id: Uuid, next: OrderStatus) -> CoreResult<Order> {
        if next == OrderStatus::Cancelled {
            return self.cancel_order(actor, order_id).await;
        }

        let now = self.ctx.now();
        let mut tx = self.ctx.begin().await?;
        let mut order = self.load(tx.as_mut(), order_id).await?;

        transitions::authorize(&order, next, actor)?;

        let guard = order.guard();
        transitions::assign(&mut order, actor);
        order.transition(next, actor.user_id, now)?;

        // Someone else moved it since we read it
        if !tx.update_order(&order, guard).await? {
            return Err(CoreError::transition(guard.status, next));
        }
        tx.commit().await?;

        self.announce(&order, guard.status, actor, now);
        Ok(order)
    }

    pub async fn get_order(&self, actor: &Actor, order_id: Uuid) -> CoreResult<Order> {
        let mut tx = self.ctx.begin().await?;
        let order = self.load(tx.as_mut(), order_id).await?;

        let visible = actor.is_admin()
            || order.is_participant(actor.user_id)
            || transitions::queue_for(actor.role).contains(&order.status);
        if !visible {
            return Err(CoreError::Forbidden(format!("order {} is not visible to this user", order_id)));
        }
        Ok(order)
    }

    /// Role-scoped listing: own orders for buyers and sellers, work queue
    /// plus handled orders for partners, everything for admins
    pub async fn list_orders(&self, actor: &Actor) -> CoreResult<Vec<Order>> {
        let mut tx = self.ctx.begin().await?;
        match actor.role {
            Role::Buyer => tx.list_orders(OrderQuery::Buyer(actor.user_id)).await,
            Role::Seller => tx.list_orders(OrderQuery::Seller(actor.user_id)).await,
            Role::Admin => tx.list_orders(OrderQuery::All).await,
            Role::Logistics | Role::Coldstorage | Role::Driver => {
                let mut orders = Vec::new();
                for status in transitions::queue_for(actor.role) {
                    let queued = tx.list_orders(OrderQuery::Status(status)).await?;
                    orders.extend(queued.into_iter().filter(|o| match actor.role {
                        Role::Coldstorage => o.coldstorage_id.is_none() || o.coldstorage_id == Some(actor.user_id),
                        _ => true,
                    }));
                }
                for order in tx.list_orders(OrderQuery::Handler(actor.user_id)).await? {
                    if !orders.iter().any(|o| o.id == order.id) {
                        orders.push(order);
                    }
                }
                orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                Ok(orders)
            }
            Role::Insurance => Err(CoreError::Forbidden("insurance agents do not list orders".to_string())),
        }
    }

    async fn load(&self, tx: &mut dyn agrimart_core::StoreTx, order_id: Uuid) -> CoreResult<Order> {
        tx.get_order(order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("order", order_id))
    }

    fn announce(&self, order: &Order, from: OrderStatus, actor: &Actor, now: chrono::DateTime<chrono::Utc>) {
        tracing::info!(
            order_id = %order.id,
            from = %from,
            to = %order.status,
            actor_id = %actor.user_id,
            "Order status changed"
        );
        self.ctx.publish(DomainEvent::OrderStatusChanged(OrderStatusChangedEvent {
            order_id: order.id,
            buyer_id: order.buyer_id,
            seller_id: order.seller_id,
            from: from.to_string(),
            to: order.status.to_string(),
            actor_id: actor.user_id,
            timestamp: now,
        }));
    }
}
