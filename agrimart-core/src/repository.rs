use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use agrimart_catalog::Product;

use crate::complaint::Complaint;
use crate::identity::{Credential, Role, User};
use crate::insurance::{Insurance, InsuranceClaim, Policy};
use crate::ledger::{Account, Transaction};
use crate::order::{Order, OrderGuard, OrderStatus};
use crate::CoreResult;

/// System of record. Every workflow operation runs inside one transaction.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> CoreResult<Box<dyn StoreTx>>;
}

/// Order listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderQuery {
    All,
    Buyer(Uuid),
    Seller(Uuid),
    Status(OrderStatus),
    /// Orders whose logistics, cold storage or driver reference is this user
    Handler(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplaintQuery {
    All,
    Buyer(Uuid),
    Seller(Uuid),
    Order(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimQuery {
    All,
    Agent(Uuid),
    Seller(Uuid),
}

/// An open unit of work. Dropping it without `commit` discards every write.
///
/// Lists come back newest first unless noted.
#[async_trait]
pub trait StoreTx: Send {
    async fn get_user(&mut self, id: Uuid) -> CoreResult<Option<User>>;
    async fn find_user_by_email(&mut self, email: &str) -> CoreResult<Option<User>>;
    async fn put_user(&mut self, user: &User) -> CoreResult<()>;
    /// Oldest registration first
    async fn list_users_by_role(&mut self, role: Role) -> CoreResult<Vec<User>>;
    async fn get_credential(&mut self, user_id: Uuid) -> CoreResult<Option<Credential>>;
    async fn put_credential(&mut self, credential: &Credential) -> CoreResult<()>;

    async fn get_product(&mut self, id: Uuid) -> CoreResult<Option<Product>>;
    async fn put_product(&mut self, product: &Product) -> CoreResult<()>;
    async fn list_products(&mut self, seller_id: Option<Uuid>) -> CoreResult<Vec<Product>>;

    async fn get_order(&mut self, id: Uuid) -> CoreResult<Option<Order>>;
    /// Fails with `DuplicateOperation` if the id already exists
    async fn insert_order(&mut self, order: &Order) -> CoreResult<()>;
    /// Conditional write: only applies when the stored order still matches
    /// `expected`. Returns whether the write happened.
    async fn update_order(&mut self, order: &Order, expected: OrderGuard) -> CoreResult<bool>;
    async fn list_orders(&mut self, query: OrderQuery) -> CoreResult<Vec<Order>>;

    async fn get_complaint(&mut self, id: Uuid) -> CoreResult<Option<Complaint>>;
    async fn put_complaint(&mut self, complaint: &Complaint) -> CoreResult<()>;
    async fn list_complaints(&mut self, query: ComplaintQuery) -> CoreResult<Vec<Complaint>>;

    async fn get_policy(&mut self, id: Uuid) -> CoreResult<Option<Policy>>;
    async fn put_policy(&mut self, policy: &Policy) -> CoreResult<()>;
    async fn list_policies(&mut self) -> CoreResult<Vec<Policy>>;

    async fn get_insurance(&mut self, id: Uuid) -> CoreResult<Option<Insurance>>;
    async fn put_insurance(&mut self, insurance: &Insurance) -> CoreResult<()>;
    async fn list_insurances(&mut self, user_id: Option<Uuid>) -> CoreResult<Vec<Insurance>>;

    async fn get_claim(&mut self, id: Uuid) -> CoreResult<Option<InsuranceClaim>>;
    async fn put_claim(&mut self, claim: &InsuranceClaim) -> CoreResult<()>;
    async fn list_claims(&mut self, query: ClaimQuery) -> CoreResult<Vec<InsuranceClaim>>;

    /// Load the account, opening it at `now` on first touch, and hold it
    /// exclusively until the transaction ends
    async fn lock_account(&mut self, user_id: Uuid, now: DateTime<Utc>) -> CoreResult<Account>;
    async fn put_account(&mut self, account: &Account) -> CoreResult<()>;
    async fn list_accounts(&mut self) -> CoreResult<Vec<Account>>;

    /// Fails with `DuplicateOperation` if the idempotency key was used before
    async fn append_transaction(&mut self, transaction: &Transaction) -> CoreResult<()>;
    async fn list_transactions(&mut self, user_id: Uuid) -> CoreResult<Vec<Transaction>>;

    async fn commit(self: Box<Self>) -> CoreResult<()>;
}
