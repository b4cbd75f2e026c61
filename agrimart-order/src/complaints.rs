use serde::Deserialize;
use uuid::Uuid;
use agrimart_core::complaint::{Complaint, ComplaintReason, ComplaintResolution, ComplaintStatus};
use agrimart_core::ledger::TransactionKind;
use agrimart_core::order::OrderStatus;
use agrimart_core::repository::{ClaimQuery, ComplaintQuery};
use agrimart_core::{Actor, CoreError, CoreResult, Role, StoreTx};
use agrimart_shared::models::events::{ComplaintClosedEvent, ComplaintFiledEvent, DomainEvent};

use crate::context::WorkflowContext;
use crate::finance::{self, Posting};

#[derive(Debug, Clone, Deserialize)]
pub struct FileComplaint {
    pub order_id: Uuid,
    pub reason: ComplaintReason,
    pub description: String,
}

/// Buyer complaints and the seller's direct settlement of them
#[derive(Clone)]
pub struct ComplaintRouter {
    ctx: WorkflowContext,
}

impl ComplaintRouter {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self { ctx }
    }

    /// Open a complaint on a dispatched or delivered order, inside the
    /// filing window measured from dispatch to the customer
    pub async fn file_complaint(&self, actor: &Actor, request: FileComplaint) -> CoreResult<Complaint> {
        actor.require_role(Role::Buyer)?;
        let now = self.ctx.now();
        let mut tx = self.ctx.begin().await?;

        let mut order = tx
            .get_order(request.order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("order", request.order_id))?;
        actor.require_owner(Role::Buyer, order.buyer_id)?;

        if !matches!(order.status, OrderStatus::DispatchedToCustomer | OrderStatus::Delivered) {
            return Err(CoreError::transition(order.status, "complaint"));
        }

        let dispatched_at = order
            .transitioned_at(OrderStatus::DispatchedToCustomer)
            .ok_or_else(|| CoreError::transition(order.status, "complaint"))?;
        let deadline = dispatched_at + self.ctx.rules.complaint_window;
        if now > deadline {
            return Err(CoreError::Forbidden(format!(
                "complaint window for order {} closed at {}",
                order.id,
                deadline.to_rfc3339()
            )));
        }

        let existing = tx.list_complaints(ComplaintQuery::Order(order.id)).await?;
        if let Some(open) = existing.iter().find(|c| c.status.is_open()) {
            return Err(CoreError::DuplicateOperation(format!(
                "order {} already has open complaint {}",
                order.id, open.id
            )));
        }

        let complaint = Complaint::new(&order, request.reason, &request.description, now)?;
        tx.put_complaint(&complaint).await?;

        let guard = order.guard();
        order.complaint_id = Some(complaint.id);
        order.touch(now);
        if !tx.update_order(&order, guard).await? {
            return Err(CoreError::transition(guard.status, "complaint"));
        }
        tx.commit().await?;

        tracing::info!(complaint_id = %complaint.id, order_id = %order.id, reason = ?complaint.reason, "Complaint filed");
        self.ctx.publish(DomainEvent::ComplaintFiled(ComplaintFiledEvent {
            complaint_id: complaint.id,
            order_id: order.id,
            buyer_id: complaint.buyer_id,
            seller_id: complaint.seller_id,
            timestamp: now,
        }));
        Ok(complaint)
    }

    pub async fn cancel_complaint(&self, actor: &Actor, complaint_id: Uuid, reason: Option<String>) -> CoreResult<Complaint> {
        let now = self.ctx.now();
        let mut tx = self.ctx.begin().await?;
        let mut complaint = load(tx.as_mut(), complaint_id).await?;
        actor.require_owner(Role::Buyer, complaint.buyer_id)?;

        complaint.cancel(reason, now)?;
        tx.put_complaint(&complaint).await?;
        tx.commit().await?;

        self.closed(&complaint, now);
        Ok(complaint)
    }

    /// Seller settles a pending complaint without involving insurance.
    /// A refund comes out of the seller's balance.
    pub async fn resolve_complaint(
        &self,
        actor: &Actor,
        complaint_id: Uuid,
        resolution: ComplaintResolution,
        note: Option<String>,
    ) -> CoreResult<Complaint> {
        let now = self.ctx.now();
        let mut tx = self.ctx.begin().await?;
        let mut complaint = load(tx.as_mut(), complaint_id).await?;
        actor.require_owner(Role::Seller, complaint.seller_id)?;

        // Claimed complaints belong to the insurer now
        if complaint.status != ComplaintStatus::Pending {
            let target = match resolution {
                ComplaintResolution::Accept => ComplaintStatus::Approved,
                ComplaintResolution::Refund => ComplaintStatus::Refunded,
                ComplaintResolution::Reject => ComplaintStatus::Rejected,
            };
            return Err(CoreError::transition(complaint.status, target));
        }

        let status = match resolution {
            ComplaintResolution::Accept => ComplaintStatus::Approved,
            ComplaintResolution::Reject => ComplaintStatus::Rejected,
            ComplaintResolution::Refund => {
                let order = tx
                    .get_order(complaint.order_id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("order", complaint.order_id))?;
                finance::lock_accounts(tx.as_mut(), &[complaint.seller_id, complaint.buyer_id], now).await?;
                finance::debit(
                    tx.as_mut(),
                    Posting::new(complaint.seller_id, TransactionKind::SaleReversal, order.total, complaint.id, format!("Refund for complaint {}", complaint.id)),
                    now,
                )
                .await?;
                finance::credit(
                    tx.as_mut(),
                    Posting::new(complaint.buyer_id, TransactionKind::OrderRefund, order.total, complaint.id, format!("Refund for complaint {}", complaint.id)),
                    now,
                )
                .await?;
                ComplaintStatus::Refunded
            }
        };

        complaint.close(status, note, now)?;
        tx.put_complaint(&complaint).await?;
        tx.commit().await?;

        self.closed(&complaint, now);
        Ok(complaint)
    }

    pub async fn get_complaint(&self, actor: &Actor, complaint_id: Uuid) -> CoreResult<Complaint> {
        let mut tx = self.ctx.begin().await?;
        let complaint = load(tx.as_mut(), complaint_id).await?;

        let mut visible = actor.is_admin() || actor.user_id == complaint.buyer_id || actor.user_id == complaint.seller_id;
        if !visible && actor.role == Role::Insurance {
            if let Some(claim_id) = complaint.claim_id {
                visible = tx.get_claim(claim_id).await?.is_some_and(|c| c.agent_id == actor.user_id);
            }
        }
        if !visible {
            return Err(CoreError::Forbidden(format!("complaint {} is not visible to this user", complaint_id)));
        }
        Ok(complaint)
    }

    pub async fn list_complaints(&self, actor: &Actor) -> CoreResult<Vec<Complaint>> {
        let mut tx = self.ctx.begin().await?;
        match actor.role {
            Role::Buyer => tx.list_complaints(ComplaintQuery::Buyer(actor.user_id)).await,
            Role::Seller => tx.list_complaints(ComplaintQuery::Seller(actor.user_id)).await,
            Role::Admin => tx.list_complaints(ComplaintQuery::All).await,
            Role::Insurance => {
                let mut complaints = Vec::new();
                for claim in tx.list_claims(ClaimQuery::Agent(actor.user_id)).await? {
                    if let Some(complaint) = tx.get_complaint(claim.complaint_id).await? {
                        complaints.push(complaint);
                    }
                }
                Ok(complaints)
            }
            _ => Err(CoreError::Forbidden(format!("{} users have no complaints", actor.role))),
        }
    }

    fn closed(&self, complaint: &Complaint, now: chrono::DateTime<chrono::Utc>) {
        tracing::info!(complaint_id = %complaint.id, status = %complaint.status, "Complaint closed");
        self.ctx.publish(DomainEvent::ComplaintClosed(ComplaintClosedEvent {
            complaint_id: complaint.id,
            buyer_id: complaint.buyer_id,
            seller_id: complaint.seller_id,
            status: complaint.status.to_string(),
            timestamp: now,
        }));
    }
}

pub(crate) async fn load(tx: &mut dyn StoreTx, complaint_id: Uuid) -> CoreResult<Complaint> {
    tx.get_complaint(complaint_id)
        .await?
        .ok_or_else(|| CoreError::not_found("complaint", complaint_id))
}
