use serde::Deserialize;
use uuid::Uuid;
use chrono::{DateTime, Utc};
use agrimart_core::insurance::{Insurance, Policy};
use agrimart_core::ledger::TransactionKind;
use agrimart_core::{Actor, CoreError, CoreResult, Role, StoreTx, User};
use agrimart_shared::models::events::{DomainEvent, PolicyPurchasedEvent};

use crate::context::WorkflowContext;
use crate::finance::{self, Posting};

#[derive(Debug, Clone, Deserialize)]
pub struct NewPolicy {
    pub name: String,
    pub premium: i64,
    pub coverage: i64,
    pub duration_days: i64,
}

/// Insurance products and the sellers' holdings of them
#[derive(Clone)]
pub struct PolicyDesk {
    ctx: WorkflowContext,
}

impl PolicyDesk {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self { ctx }
    }

    pub async fn create_policy(&self, actor: &Actor, input: NewPolicy) -> CoreResult<Policy> {
        actor.require_role(Role::Insurance)?;
        let now = self.ctx.now();
        let policy = Policy::new(actor.user_id, &input.name, input.premium, input.coverage, input.duration_days, now)?;

        let mut tx = self.ctx.begin().await?;
        tx.put_policy(&policy).await?;
        tx.commit().await?;

        tracing::info!(policy_id = %policy.id, agent_id = %actor.user_id, coverage = policy.coverage, "Policy published");
        Ok(policy)
    }

    pub async fn list_policies(&self) -> CoreResult<Vec<Policy>> {
        let mut tx = self.ctx.begin().await?;
        let policies = tx.list_policies().await?;
        Ok(policies.into_iter().filter(|p| p.is_active).collect())
    }

    /// Seller buys cover starting now. The premium is debited up front.
    pub async fn purchase_policy(&self, actor: &Actor, policy_id: Uuid) -> CoreResult<Insurance> {
        actor.require_role(Role::Seller)?;
        let now = self.ctx.now();
        let mut tx = self.ctx.begin().await?;

        let policy = tx
            .get_policy(policy_id)
            .await?
            .ok_or_else(|| CoreError::not_found("policy", policy_id))?;
        if !policy.is_active {
            return Err(CoreError::ValidationError(format!("policy {} is no longer offered", policy.id)));
        }
        let holder = tx
            .get_user(actor.user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("user", actor.user_id))?;
        let agent = tx.get_user(policy.agent_id).await?.filter(|u| u.role == Role::Insurance);

        let holding = Insurance::issue(&holder, &policy, agent.as_ref(), now);
        if policy.premium > 0 {
            finance::debit(
                tx.as_mut(),
                Posting::new(holder.id, TransactionKind::PremiumPayment, policy.premium, holding.id, format!("Premium: {}", policy.name)),
                now,
            )
            .await?;
        }
        tx.put_insurance(&holding).await?;
        tx.commit().await?;

        tracing::info!(insurance_id = %holding.id, seller_id = %holder.id, policy_id = %policy.id, "Policy purchased");
        self.ctx.publish(DomainEvent::PolicyPurchased(PolicyPurchasedEvent {
            insurance_id: holding.id,
            policy_id: policy.id,
            user_id: holder.id,
            premium: policy.premium,
            timestamp: now,
        }));
        Ok(holding)
    }

    pub async fn list_holdings(&self, actor: &Actor) -> CoreResult<Vec<Insurance>> {
        let mut tx = self.ctx.begin().await?;
        match actor.role {
            Role::Seller => tx.list_insurances(Some(actor.user_id)).await,
            Role::Admin => tx.list_insurances(None).await,
            Role::Insurance => {
                let all = tx.list_insurances(None).await?;
                Ok(all.into_iter().filter(|i| i.agent_id == Some(actor.user_id)).collect())
            }
            _ => Err(CoreError::Forbidden(format!("{} users hold no insurance", actor.role))),
        }
    }
}

/// The seller's holding that covers `now`; the most recently bought wins
pub async fn active_holding(tx: &mut dyn StoreTx, seller_id: Uuid, now: DateTime<Utc>) -> CoreResult<Insurance> {
    tx.list_insurances(Some(seller_id))
        .await?
        .into_iter()
        .filter(|holding| holding.is_active_at(now))
        .max_by_key(|holding| holding.created_at)
        .ok_or(CoreError::NoActivePolicy(seller_id))
}

/// The holding's own agent, else the longest-registered insurance agent
pub async fn resolve_agent(tx: &mut dyn StoreTx, holding: &Insurance) -> CoreResult<User> {
    if let Some(agent_id) = holding.agent_id {
        match tx.get_user(agent_id).await? {
            Some(agent) if agent.role == Role::Insurance => return Ok(agent),
            _ => tracing::warn!(insurance_id = %holding.id, agent_id = %agent_id, "Assigned agent unavailable, falling back"),
        }
    }

    tx.list_users_by_role(Role::Insurance)
        .await?
        .into_iter()
        .next()
        .ok_or(CoreError::NoAgentAvailable)
}
