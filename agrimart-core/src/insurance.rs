use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Duration, Utc};
use agrimart_shared::Masked;
use std::fmt;

use crate::identity::User;
use crate::{CoreError, CoreResult};

/// An insurance product published by an agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Policy {
    pub id: Uuid,
    pub name: String,
    pub premium: i64,
    pub coverage: i64,
    pub duration_days: i64,
    pub agent_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Policy {
    pub fn new(
        agent_id: Uuid,
        name: &str,
        premium: i64,
        coverage: i64,
        duration_days: i64,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        if name.trim().is_empty() {
            return Err(CoreError::ValidationError("policy name must not be empty".to_string()));
        }
        if premium < 0 || coverage <= 0 {
            return Err(CoreError::ValidationError(
                "premium must be non-negative and coverage positive".to_string(),
            ));
        }
        if !(1..=3650).contains(&duration_days) {
            return Err(CoreError::ValidationError(format!("invalid policy duration: {} days", duration_days)));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            premium,
            coverage,
            duration_days,
            agent_id,
            is_active: true,
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceStatus {
    Active,
    Expired,
}

/// A seller's holding of a policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Insurance {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_email: Masked<String>,
    pub policy_id: Uuid,
    pub premium: i64,
    pub coverage: i64,
    pub claimed_total: i64,
    pub duration_days: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: InsuranceStatus,
    pub agent_id: Option<Uuid>,
    pub agent_name: Option<String>,
    pub agent_email: Option<Masked<String>>,
    pub created_at: DateTime<Utc>,
}

impl Insurance {
    pub fn issue(holder: &User, policy: &Policy, agent: Option<&User>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: holder.id,
            user_email: holder.email.clone(),
            policy_id: policy.id,
            premium: policy.premium,
            coverage: policy.coverage,
            claimed_total: 0,
            duration_days: policy.duration_days,
            start_date: now,
            end_date: now + Duration::days(policy.duration_days),
            status: InsuranceStatus::Active,
            agent_id: agent.map(|a| a.id),
            agent_name: agent.map(|a| a.name.clone()),
            agent_email: agent.map(|a| a.email.clone()),
            created_at: now,
        }
    }

    /// Active only inside `[start_date, end_date]`, whatever the stored status says
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == InsuranceStatus::Active && self.start_date <= now && now <= self.end_date
    }

    pub fn effective_status(&self, now: DateTime<Utc>) -> InsuranceStatus {
        if self.is_active_at(now) {
            InsuranceStatus::Active
        } else {
            InsuranceStatus::Expired
        }
    }

    pub fn remaining_coverage(&self) -> i64 {
        (self.coverage - self.claimed_total).max(0)
    }

    /// Book a payout against the holding, capped at the coverage left.
    /// Returns the amount actually covered.
    pub fn record_payout(&mut self, requested: i64) -> CoreResult<i64> {
        let covered = requested.min(self.remaining_coverage());
        if covered <= 0 {
            return Err(CoreError::ValidationError(format!(
                "coverage of insurance {} is exhausted",
                self.id
            )));
        }
        self.claimed_total = self
            .claimed_total
            .checked_add(covered)
            .ok_or_else(|| CoreError::ValidationError(format!("claimed total overflow on insurance {}", self.id)))?;
        Ok(covered)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Rejected => "rejected",
        })
    }
}

/// Agent verdict on a claim
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClaimDecision {
    Approved,
    Rejected,
}

impl From<ClaimDecision> for ClaimStatus {
    fn from(decision: ClaimDecision) -> Self {
        match decision {
            ClaimDecision::Approved => ClaimStatus::Approved,
            ClaimDecision::Rejected => ClaimStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsuranceClaim {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub insurance_id: Uuid,
    pub seller_id: Uuid,
    pub seller_name: String,
    pub buyer_id: Uuid,
    pub buyer_name: String,
    pub amount: i64,
    pub status: ClaimStatus,
    pub agent_id: Uuid,
    pub agent_comments: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InsuranceClaim {
    /// Record the agent's verdict. Only pending claims can be decided.
    pub fn decide(&mut self, decision: ClaimDecision, comments: Option<String>, now: DateTime<Utc>) -> CoreResult<()> {
        let next = ClaimStatus::from(decision);
        if self.status != ClaimStatus::Pending {
            return Err(CoreError::transition(self.status, next));
        }

        self.status = next;
        self.agent_comments = comments;
        self.decided_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}
