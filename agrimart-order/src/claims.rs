use uuid::Uuid;
use agrimart_core::complaint::ComplaintStatus;
use agrimart_core::insurance::{ClaimDecision, ClaimStatus, InsuranceClaim};
use agrimart_core::ledger::TransactionKind;
use agrimart_core::repository::ClaimQuery;
use agrimart_core::{Actor, CoreError, CoreResult, Role, StoreTx};
use agrimart_shared::models::events::{ClaimDecidedEvent, ClaimFiledEvent, DomainEvent};

use crate::complaints;
use crate::context::WorkflowContext;
use crate::finance::{self, Posting};
use crate::policies;

/// Escalates complaints to the seller's insurer and records the agent's verdict
#[derive(Clone)]
pub struct ClaimRouter {
    ctx: WorkflowContext,
}

impl ClaimRouter {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self { ctx }
    }

    /// Seller hands a pending complaint to insurance. The claim is routed to
    /// the agent behind the seller's active holding.
    pub async fn file_claim(&self, actor: &Actor, complaint_id: Uuid) -> CoreResult<InsuranceClaim> {
        actor.require_role(Role::Seller)?;
        let now = self.ctx.now();
        let mut tx = self.ctx.begin().await?;

        let mut complaint = complaints::load(tx.as_mut(), complaint_id).await?;
        actor.require_owner(Role::Seller, complaint.seller_id)?;
        if complaint.has_claim || complaint.claim_id.is_some() {
            return Err(CoreError::DuplicateOperation(format!("complaint {} already has a claim", complaint.id)));
        }
        if complaint.status != ComplaintStatus::Pending {
            return Err(CoreError::transition(complaint.status, ComplaintStatus::Claimed));
        }

        let order = tx
            .get_order(complaint.order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("order", complaint.order_id))?;
        let holding = policies::active_holding(tx.as_mut(), complaint.seller_id, now).await?;
        let agent = policies::resolve_agent(tx.as_mut(), &holding).await?;

        let amount = order.total.min(holding.remaining_coverage());
        if amount <= 0 {
            return Err(CoreError::ValidationError(format!(
                "insurance {} has no coverage left",
                holding.id
            )));
        }

        let seller_name = display_name(tx.as_mut(), complaint.seller_id).await?;
        let buyer_name = display_name(tx.as_mut(), complaint.buyer_id).await?;

        let claim = InsuranceClaim {
            id: Uuid::new_v4(),
            complaint_id: complaint.id,
            order_id: order.id,
            product_id: order.product_id,
            insurance_id: holding.id,
            seller_id: complaint.seller_id,
            seller_name,
            buyer_id: complaint.buyer_id,
            buyer_name,
            amount,
            status: ClaimStatus::Pending,
            agent_id: agent.id,
            agent_comments: None,
            decided_at: None,
            created_at: now,
            updated_at: now,
        };
        complaint.attach_claim(claim.id, now)?;
        tx.put_claim(&claim).await?;
        tx.put_complaint(&complaint).await?;
        tx.commit().await?;

        tracing::info!(
            claim_id = %claim.id,
            complaint_id = %complaint.id,
            agent_id = %agent.id,
            amount = claim.amount,
            "Insurance claim filed"
        );
        self.ctx.publish(DomainEvent::ClaimFiled(ClaimFiledEvent {
            claim_id: claim.id,
            complaint_id: complaint.id,
            agent_id: agent.id,
            amount: claim.amount,
            timestamp: now,
        }));
        Ok(claim)
    }

    /// Assigned agent approves or rejects. Approval pays the buyer and
    /// closes the complaint as refunded. Repeating the same verdict is a no-op.
    pub async fn process_claim(
        &self,
        actor: &Actor,
        claim_id: Uuid,
        decision: ClaimDecision,
        comments: Option<String>,
    ) -> CoreResult<InsuranceClaim> {
        actor.require_role(Role::Insurance)?;
        let now = self.ctx.now();
        let mut tx = self.ctx.begin().await?;

        let mut claim = load(tx.as_mut(), claim_id).await?;
        if claim.agent_id != actor.user_id {
            return Err(CoreError::Forbidden(format!("claim {} is assigned to another agent", claim.id)));
        }
        if claim.status != ClaimStatus::Pending {
            if claim.status == ClaimStatus::from(decision) {
                tracing::debug!(claim_id = %claim.id, status = %claim.status, "Claim already decided");
                return Ok(claim);
            }
            return Err(CoreError::transition(claim.status, ClaimStatus::from(decision)));
        }

        let mut complaint = complaints::load(tx.as_mut(), claim.complaint_id).await?;
        claim.decide(decision, comments.clone(), now)?;

        let payout = match decision {
            ClaimDecision::Approved => {
                let mut holding = tx
                    .get_insurance(claim.insurance_id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("insurance", claim.insurance_id))?;
                // Other claims may have used up coverage since this one was filed
                let covered = holding.record_payout(claim.amount)?;
                if covered < claim.amount {
                    tracing::warn!(
                        claim_id = %claim.id,
                        requested = claim.amount,
                        covered,
                        "Claim capped at remaining coverage"
                    );
                    claim.amount = covered;
                }
                finance::credit(
                    tx.as_mut(),
                    Posting::new(claim.buyer_id, TransactionKind::ClaimPayout, covered, claim.id, format!("Insurance payout for claim {}", claim.id)),
                    now,
                )
                .await?;
                tx.put_insurance(&holding).await?;
                complaint.close(ComplaintStatus::Refunded, comments, now)?;
                covered
            }
            ClaimDecision::Rejected => {
                complaint.close(ComplaintStatus::Rejected, comments, now)?;
                0
            }
        };

        tx.put_claim(&claim).await?;
        tx.put_complaint(&complaint).await?;
        tx.commit().await?;

        tracing::info!(claim_id = %claim.id, decision = %claim.status, payout, "Insurance claim decided");
        self.ctx.publish(DomainEvent::ClaimDecided(ClaimDecidedEvent {
            claim_id: claim.id,
            complaint_id: claim.complaint_id,
            agent_id: claim.agent_id,
            buyer_id: claim.buyer_id,
            decision: claim.status.to_string(),
            payout,
            timestamp: now,
        }));
        Ok(claim)
    }

    pub async fn get_claim(&self, actor: &Actor, claim_id: Uuid) -> CoreResult<InsuranceClaim> {
        let mut tx = self.ctx.begin().await?;
        let claim = load(tx.as_mut(), claim_id).await?;
        let visible = actor.is_admin()
            || actor.user_id == claim.agent_id
            || actor.user_id == claim.seller_id
            || actor.user_id == claim.buyer_id;
        if !visible {
            return Err(CoreError::Forbidden(format!("claim {} is not visible to this user", claim_id)));
        }
        Ok(claim)
    }

    pub async fn list_claims(&self, actor: &Actor) -> CoreResult<Vec<InsuranceClaim>> {
        let mut tx = self.ctx.begin().await?;
        match actor.role {
            Role::Insurance => tx.list_claims(ClaimQuery::Agent(actor.user_id)).await,
            Role::Seller => tx.list_claims(ClaimQuery::Seller(actor.user_id)).await,
            Role::Admin => tx.list_claims(ClaimQuery::All).await,
            _ => Err(CoreError::Forbidden(format!("{} users have no claims", actor.role))),
        }
    }
}

async fn load(tx: &mut dyn StoreTx, claim_id: Uuid) -> CoreResult<InsuranceClaim> {
    tx.get_claim(claim_id)
        .await?
        .ok_or_else(|| CoreError::not_found("claim", claim_id))
}

async fn display_name(tx: &mut dyn StoreTx, user_id: Uuid) -> CoreResult<String> {
    Ok(tx
        .get_user(user_id)
        .await?
        .map(|u| u.name)
        .unwrap_or_else(|| "Unknown".to_string()))
}
