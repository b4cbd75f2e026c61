use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::order::Order;
use crate::{CoreError, CoreResult};

/// Canonical complaint status set.
///
/// `claimed` marks a complaint the seller has handed to their insurer; it is
/// still open until the agent decides.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Pending,
    Claimed,
    Approved,
    Rejected,
    Refunded,
    Cancelled,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "pending",
            ComplaintStatus::Claimed => "claimed",
            ComplaintStatus::Approved => "approved",
            ComplaintStatus::Rejected => "rejected",
            ComplaintStatus::Refunded => "refunded",
            ComplaintStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ComplaintStatus::Pending | ComplaintStatus::Claimed)
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintReason {
    Damaged,
    Spoiled,
    WrongItem,
    ShortQuantity,
    LateDelivery,
    Other,
}

/// How a seller settles a complaint without going through insurance
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintResolution {
    /// Acknowledged, handled outside the ledger (e.g. replacement shipped)
    Accept,
    /// Seller pays the buyer back
    Refund,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Complaint {
    pub id: Uuid,
    pub order_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub reason: ComplaintReason,
    pub description: String,
    pub status: ComplaintStatus,
    pub has_claim: bool,
    pub claim_id: Option<Uuid>,
    pub resolution_note: Option<String>,
    pub cancellation_date: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Complaint {
    pub fn new(order: &Order, reason: ComplaintReason, description: &str, now: DateTime<Utc>) -> CoreResult<Self> {
        let description = description.trim();
        if description.is_empty() {
            return Err(CoreError::ValidationError("complaint description must not be empty".to_string()));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            order_id: order.id,
            buyer_id: order.buyer_id,
            seller_id: order.seller_id,
            reason,
            description: description.to_string(),
            status: ComplaintStatus::Pending,
            has_claim: false,
            claim_id: None,
            resolution_note: None,
            cancellation_date: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Buyer withdraws the complaint. Never allowed once a claim exists.
    pub fn cancel(&mut self, reason: Option<String>, now: DateTime<Utc>) -> CoreResult<()> {
        if self.has_claim || self.claim_id.is_some() {
            return Err(CoreError::Forbidden(format!(
                "complaint {} has an insurance claim and cannot be cancelled",
                self.id
            )));
        }
        if self.status != ComplaintStatus::Pending {
            return Err(CoreError::transition(self.status, ComplaintStatus::Cancelled));
        }

        self.status = ComplaintStatus::Cancelled;
        self.cancellation_date = Some(now);
        self.cancellation_reason = reason;
        self.updated_at = now;
        Ok(())
    }

    pub fn attach_claim(&mut self, claim_id: Uuid, now: DateTime<Utc>) -> CoreResult<()> {
        if self.has_claim || self.claim_id.is_some() {
            return Err(CoreError::DuplicateOperation(format!("complaint {} already has a claim", self.id)));
        }
        if self.status != ComplaintStatus::Pending {
            return Err(CoreError::transition(self.status, ComplaintStatus::Claimed));
        }

        self.has_claim = true;
        self.claim_id = Some(claim_id);
        self.status = ComplaintStatus::Claimed;
        self.updated_at = now;
        Ok(())
    }

    /// Close an open complaint with a terminal status
    pub fn close(&mut self, status: ComplaintStatus, note: Option<String>, now: DateTime<Utc>) -> CoreResult<()> {
        let terminal = matches!(
            status,
            ComplaintStatus::Approved | ComplaintStatus::Rejected | ComplaintStatus::Refunded
        );
        if !terminal || !self.status.is_open() {
            return Err(CoreError::transition(self.status, status));
        }

        self.status = status;
        self.resolution_note = note;
        self.updated_at = now;
        Ok(())
    }
}
