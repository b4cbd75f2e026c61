use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use agrimart_catalog::Product;
use crate::{CoreError, CoreResult};

/// Order status in the fulfilment lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    DispatchedToLogistics,
    DispatchedToColdstorage,
    InColdstorage,
    DispatchedToCustomer,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::DispatchedToLogistics,
        OrderStatus::DispatchedToColdstorage,
        OrderStatus::InColdstorage,
        OrderStatus::DispatchedToCustomer,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::DispatchedToLogistics => "dispatched_to_logistics",
            OrderStatus::DispatchedToColdstorage => "dispatched_to_coldstorage",
            OrderStatus::InColdstorage => "in_coldstorage",
            OrderStatus::DispatchedToCustomer => "dispatched_to_customer",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Adjacency table. Anything not listed here is rejected.
    pub fn successors(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Confirmed, OrderStatus::Cancelled],
            OrderStatus::Confirmed => &[OrderStatus::DispatchedToLogistics],
            OrderStatus::DispatchedToLogistics => &[
                OrderStatus::DispatchedToColdstorage,
                OrderStatus::DispatchedToCustomer,
            ],
            OrderStatus::DispatchedToColdstorage => &[OrderStatus::InColdstorage],
            OrderStatus::InColdstorage => &[OrderStatus::DispatchedToCustomer],
            OrderStatus::DispatchedToCustomer => &[OrderStatus::Delivered],
            OrderStatus::Delivered | OrderStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.successors().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::ValidationError(format!("unknown order status: {}", s)))
    }
}

/// Where the logistics partner takes the goods
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryDestination {
    #[default]
    Customer,
    Coldstorage,
}

/// One entry in the order's audit trail
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusChange {
    pub from: Option<OrderStatus>,
    pub to: OrderStatus,
    pub actor_id: Uuid,
    pub at: DateTime<Utc>,
}

/// Expected stored state for a conditional order write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderGuard {
    pub status: OrderStatus,
    pub version: u64,
}

/// A buyer's purchase of one seller's product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub price: i64,
    pub quantity: i64,
    pub total: i64,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub status: OrderStatus,
    pub delivery_destination: DeliveryDestination,
    pub logistics_id: Option<Uuid>,
    pub coldstorage_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub complaint_id: Option<Uuid>,
    pub history: Vec<StatusChange>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Snapshot the product's price into a new pending order
    pub fn place(
        buyer_id: Uuid,
        product: &Product,
        quantity: i64,
        destination: DeliveryDestination,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        if buyer_id == product.seller_id {
            return Err(CoreError::ValidationError("sellers cannot buy their own produce".to_string()));
        }
        let total = product.quote(quantity)?;

        Ok(Self {
            id: Uuid::new_v4(),
            product_id: product.id,
            product_name: product.name.clone(),
            price: product.price,
            quantity,
            total,
            buyer_id,
            seller_id: product.seller_id,
            status: OrderStatus::Pending,
            delivery_destination: destination,
            logistics_id: None,
            coldstorage_id: None,
            driver_id: None,
            complaint_id: None,
            history: vec![StatusChange {
                from: None,
                to: OrderStatus::Pending,
                actor_id: buyer_id,
                at: now,
            }],
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn guard(&self) -> OrderGuard {
        OrderGuard { status: self.status, version: self.version }
    }

    /// Move along one edge of the adjacency table
    pub fn transition(&mut self, to: OrderStatus, actor_id: Uuid, now: DateTime<Utc>) -> CoreResult<()> {
        if !self.status.can_transition_to(to) {
            return Err(CoreError::transition(self.status, to));
        }

        self.history.push(StatusChange {
            from: Some(self.status),
            to,
            actor_id,
            at: now,
        });
        self.status = to;
        self.touch(now);
        Ok(())
    }

    /// Bump version on any write that isn't a status change
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }

    /// When the order last entered `status`
    pub fn transitioned_at(&self, status: OrderStatus) -> Option<DateTime<Utc>> {
        self.history
            .iter()
            .rev()
            .find(|change| change.to == status)
            .map(|change| change.at)
    }

    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.buyer_id == user_id
            || self.seller_id == user_id
            || self.logistics_id == Some(user_id)
            || self.coldstorage_id == Some(user_id)
            || self.driver_id == Some(user_id)
    }
}
