use serde::Serialize;
use uuid::Uuid;
use chrono::{DateTime, Utc};
use agrimart_core::ledger::{Account, Transaction, TransactionKind};
use agrimart_core::{Actor, CoreError, CoreResult, StoreTx};
use agrimart_shared::models::events::{DomainEvent, FundsAddedEvent};

use crate::context::WorkflowContext;

/// One balance movement to post inside an open store transaction
#[derive(Debug, Clone)]
pub struct Posting {
    pub user_id: Uuid,
    pub kind: TransactionKind,
    /// Always positive; direction comes from the posting function
    pub amount: i64,
    pub related_id: Uuid,
    pub description: String,
}

impl Posting {
    pub fn new(user_id: Uuid, kind: TransactionKind, amount: i64, related_id: Uuid, description: impl Into<String>) -> Self {
        Self { user_id, kind, amount, related_id, description: description.into() }
    }
}

/// Take money out of an account, refusing to overdraw it
pub async fn debit(tx: &mut dyn StoreTx, posting: Posting, now: DateTime<Utc>) -> CoreResult<Transaction> {
    post(tx, posting, -1, true, now).await
}

/// Put money into an account
pub async fn credit(tx: &mut dyn StoreTx, posting: Posting, now: DateTime<Utc>) -> CoreResult<Transaction> {
    post(tx, posting, 1, false, now).await
}

/// Claw back an earlier credit. May leave the account negative.
pub async fn reverse(tx: &mut dyn StoreTx, posting: Posting, now: DateTime<Utc>) -> CoreResult<Transaction> {
    post(tx, posting, -1, false, now).await
}

/// Lock every account a workflow moves money between, lowest id first.
/// Workflows touching the same pair then queue instead of deadlocking,
/// whichever side they debit.
pub async fn lock_accounts(tx: &mut dyn StoreTx, user_ids: &[Uuid], now: DateTime<Utc>) -> CoreResult<()> {
    let mut ids = user_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    for id in ids {
        tx.lock_account(id, now).await?;
    }
    Ok(())
}

async fn post(
    tx: &mut dyn StoreTx,
    posting: Posting,
    sign: i64,
    check_funds: bool,
    now: DateTime<Utc>,
) -> CoreResult<Transaction> {
    if posting.amount <= 0 {
        return Err(CoreError::ValidationError(format!(
            "{} amount must be positive, got {}",
            posting.kind, posting.amount
        )));
    }

    let mut account = tx.lock_account(posting.user_id, now).await?;
    if check_funds && account.balance < posting.amount {
        return Err(CoreError::InsufficientFunds {
            required: posting.amount,
            available: account.balance,
        });
    }

    let entry = Transaction::new(
        posting.user_id,
        posting.kind,
        sign * posting.amount,
        posting.related_id,
        posting.description,
        now,
    );
    tx.append_transaction(&entry).await?;
    account.apply(entry.amount, now)?;
    tx.put_account(&account).await?;

    tracing::debug!(
        user_id = %entry.user_id,
        kind = %entry.kind,
        amount = entry.amount,
        balance = account.balance,
        "Posted ledger entry"
    );
    Ok(entry)
}

/// Result of checking one account against its ledger
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BalanceAudit {
    pub user_id: Uuid,
    pub balance: i64,
    pub ledger_sum: i64,
    pub consistent: bool,
}

/// Balances, fund additions and the audit trail
#[derive(Clone)]
pub struct AccountService {
    ctx: WorkflowContext,
}

impl AccountService {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self { ctx }
    }

    pub async fn get_balance(&self, user_id: Uuid) -> CoreResult<i64> {
        let now = self.ctx.now();
        let mut tx = self.ctx.begin().await?;
        let account = tx.lock_account(user_id, now).await?;
        Ok(account.balance)
    }

    pub async fn get_transactions(&self, user_id: Uuid) -> CoreResult<Vec<Transaction>> {
        let mut tx = self.ctx.begin().await?;
        tx.list_transactions(user_id).await
    }

    /// Credit the caller's own account. `request_id` makes retries safe:
    /// a reused id is rejected instead of paid twice.
    pub async fn add_funds(&self, actor: &Actor, amount: i64, request_id: Option<Uuid>) -> CoreResult<Transaction> {
        if amount <= 0 {
            return Err(CoreError::ValidationError(format!("amount must be positive, got {}", amount)));
        }

        let now = self.ctx.now();
        let mut tx = self.ctx.begin().await?;
        if tx.get_user(actor.user_id).await?.is_none() {
            return Err(CoreError::not_found("user", actor.user_id));
        }

        let related_id = request_id.unwrap_or_else(Uuid::new_v4);
        let entry = credit(
            tx.as_mut(),
            Posting::new(actor.user_id, TransactionKind::FundAddition, amount, related_id, "Funds added to wallet"),
            now,
        )
        .await?;
        let balance = tx.lock_account(actor.user_id, now).await?.balance;
        tx.commit().await?;

        tracing::info!(user_id = %actor.user_id, amount, balance, "Funds added");
        self.ctx.publish(DomainEvent::FundsAdded(FundsAddedEvent {
            user_id: actor.user_id,
            amount,
            balance,
            timestamp: now,
        }));
        Ok(entry)
    }

    /// Admin command: recompute every account from its transactions
    pub async fn reconcile(&self, actor: &Actor) -> CoreResult<Vec<BalanceAudit>> {
        if !actor.is_admin() {
            return Err(CoreError::Forbidden("reconciliation is an admin command".to_string()));
        }

        let mut tx = self.ctx.begin().await?;
        let accounts: Vec<Account> = tx.list_accounts().await?;
        let mut report = Vec::with_capacity(accounts.len());
        for account in accounts {
            let ledger_sum: i64 = tx
                .list_transactions(account.user_id)
                .await?
                .iter()
                .map(|t| t.amount)
                .sum();
            let consistent = ledger_sum == account.balance;
            if !consistent {
                tracing::error!(
                    user_id = %account.user_id,
                    balance = account.balance,
                    ledger_sum,
                    "Balance does not match ledger"
                );
            }
            report.push(BalanceAudit {
                user_id: account.user_id,
                balance: account.balance,
                ledger_sum,
                consistent,
            });
        }
        Ok(report)
    }
}
