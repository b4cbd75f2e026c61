use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Events emitted after a workflow step has been committed.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced(OrderPlacedEvent),
    OrderStatusChanged(OrderStatusChangedEvent),
    ComplaintFiled(ComplaintFiledEvent),
    ComplaintClosed(ComplaintClosedEvent),
    ClaimFiled(ClaimFiledEvent),
    ClaimDecided(ClaimDecidedEvent),
    FundsAdded(FundsAddedEvent),
    PolicyPurchased(PolicyPurchasedEvent),
}

impl DomainEvent {
    /// Routing key: the id of the aggregate the event is about.
    pub fn key(&self) -> Uuid {
        match self {
            DomainEvent::OrderPlaced(e) => e.order_id,
            DomainEvent::OrderStatusChanged(e) => e.order_id,
            DomainEvent::ComplaintFiled(e) => e.complaint_id,
            DomainEvent::ComplaintClosed(e) => e.complaint_id,
            DomainEvent::ClaimFiled(e) => e.claim_id,
            DomainEvent::ClaimDecided(e) => e.claim_id,
            DomainEvent::FundsAdded(e) => e.user_id,
            DomainEvent::PolicyPurchased(e) => e.insurance_id,
        }
    }

    /// Whether `user_id` is a named party of the event
    pub fn involves(&self, user_id: Uuid) -> bool {
        match self {
            DomainEvent::OrderPlaced(e) => e.buyer_id == user_id || e.seller_id == user_id,
            DomainEvent::OrderStatusChanged(e) => {
                e.buyer_id == user_id || e.seller_id == user_id || e.actor_id == user_id
            }
            DomainEvent::ComplaintFiled(e) => e.buyer_id == user_id || e.seller_id == user_id,
            DomainEvent::ComplaintClosed(e) => e.buyer_id == user_id || e.seller_id == user_id,
            DomainEvent::ClaimFiled(e) => e.agent_id == user_id,
            DomainEvent::ClaimDecided(e) => e.agent_id == user_id || e.buyer_id == user_id,
            DomainEvent::FundsAdded(e) => e.user_id == user_id,
            DomainEvent::PolicyPurchased(e) => e.user_id == user_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::OrderPlaced(_) => "order_placed",
            DomainEvent::OrderStatusChanged(_) => "order_status_changed",
            DomainEvent::ComplaintFiled(_) => "complaint_filed",
            DomainEvent::ComplaintClosed(_) => "complaint_closed",
            DomainEvent::ClaimFiled(_) => "claim_filed",
            DomainEvent::ClaimDecided(_) => "claim_decided",
            DomainEvent::FundsAdded(_) => "funds_added",
            DomainEvent::PolicyPurchased(_) => "policy_purchased",
        }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct OrderPlacedEvent {
    pub order_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub total: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct OrderStatusChangedEvent {
    pub order_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub from: String,
    pub to: String,
    pub actor_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct ComplaintFiledEvent {
    pub complaint_id: Uuid,
    pub order_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct ComplaintClosedEvent {
    pub complaint_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct ClaimFiledEvent {
    pub claim_id: Uuid,
    pub complaint_id: Uuid,
    pub agent_id: Uuid,
    pub amount: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct ClaimDecidedEvent {
    pub claim_id: Uuid,
    pub complaint_id: Uuid,
    pub agent_id: Uuid,
    pub buyer_id: Uuid,
    pub decision: String,
    pub payout: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct FundsAddedEvent {
    pub user_id: Uuid,
    pub amount: i64,
    pub balance: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct PolicyPurchasedEvent {
    pub insurance_id: Uuid,
    pub policy_id: Uuid,
    pub user_id: Uuid,
    pub premium: i64,
    pub timestamp: DateTime<Utc>,
}
