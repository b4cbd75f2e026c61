use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::{CoreError, CoreResult};

/// What caused a balance movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    ProductPurchase,
    SaleCredit,
    OrderRefund,
    SaleReversal,
    FundAddition,
    PremiumPayment,
    ClaimPayout,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::ProductPurchase => "product_purchase",
            TransactionKind::SaleCredit => "sale_credit",
            TransactionKind::OrderRefund => "order_refund",
            TransactionKind::SaleReversal => "sale_reversal",
            TransactionKind::FundAddition => "fund_addition",
            TransactionKind::PremiumPayment => "premium_payment",
            TransactionKind::ClaimPayout => "claim_payout",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One signed ledger entry. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub amount: i64,
    pub description: String,
    pub related_id: Uuid,
    /// `kind:related_id:user_id`; at most one entry per key
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        user_id: Uuid,
        kind: TransactionKind,
        amount: i64,
        related_id: Uuid,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            amount,
            description: description.into(),
            related_id,
            idempotency_key: Self::key_for(kind, related_id, user_id),
            created_at: now,
        }
    }

    pub fn key_for(kind: TransactionKind, related_id: Uuid, user_id: Uuid) -> String {
        format!("{}:{}:{}", kind.as_str(), related_id, user_id)
    }
}

/// Running balance kept next to the transactions that produce it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub user_id: Uuid,
    pub balance: i64,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn open(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self { user_id, balance: 0, version: 0, updated_at: now }
    }

    pub fn apply(&mut self, amount: i64, now: DateTime<Utc>) -> CoreResult<()> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| CoreError::ValidationError(format!("balance overflow applying {}", amount)))?;
        self.version += 1;
        self.updated_at = now;
        Ok(())
    }
}
