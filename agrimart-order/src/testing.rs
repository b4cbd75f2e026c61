use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;
use agrimart_catalog::{NewProduct, Product, ProductCategory};
use agrimart_core::complaint::{Complaint, ComplaintReason};
use agrimart_core::insurance::{Insurance, InsuranceClaim, Policy};
use agrimart_core::ledger::{Account, Transaction};
use agrimart_core::order::{DeliveryDestination, Order, OrderGuard, OrderStatus};
use agrimart_core::repository::{ClaimQuery, ComplaintQuery, OrderQuery};
use agrimart_core::{Actor, CoreResult, Credential, ManualClock, Role, Store, StoreTx, User};
use agrimart_store::MemoryStore;

use crate::{FileComplaint, Marketplace, NewPolicy, PlaceOrder, WorkflowContext};

/// In-memory marketplace with one participant per role and a product
/// priced at 200 with 10 units in stock. The buyer starts with 500.
pub struct Harness {
    pub market: Marketplace,
    pub clock: Arc<ManualClock>,
    pub buyer: Actor,
    pub seller: Actor,
    pub logistics: Actor,
    pub coldstorage: Actor,
    pub driver: Actor,
    pub agent: Actor,
    pub admin: Actor,
    pub product_id: Uuid,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new())).await
    }

    pub async fn with_store(store: Arc<dyn Store>) -> Self {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()));
        let ctx = WorkflowContext::new(store).with_clock(clock.clone());
        let market = Marketplace::new(ctx);

        let mut actors = Vec::new();
        for (role, email) in [
            (Role::Buyer, "buyer@example.in"),
            (Role::Seller, "seller@farm.in"),
            (Role::Logistics, "fleet@logistics.in"),
            (Role::Coldstorage, "vault@cold.in"),
            (Role::Driver, "driver@logistics.in"),
            (Role::Insurance, "agent@cover.in"),
        ] {
            let user = market.users.register(email, email, role, None).await.unwrap();
            actors.push(user.actor());
        }
        let admin = market.users.bootstrap_admin("Ops", "ops@agrimart.in", None).await.unwrap().actor();

        let product = market
            .catalog
            .create_product(
                &actors[1],
                NewProduct {
                    name: "Basmati Rice".to_string(),
                    category: ProductCategory::Grains,
                    unit: "kg".to_string(),
                    price: 200,
                    stock: 10,
                },
            )
            .await
            .unwrap();

        let harness = Self {
            market,
            clock,
            buyer: actors[0],
            seller: actors[1],
            logistics: actors[2],
            coldstorage: actors[3],
            driver: actors[4],
            agent: actors[5],
            admin,
            product_id: product.id,
        };
        harness.fund(&harness.buyer, 500).await;
        harness
    }

    pub fn checkout(&self, quantity: i64) -> PlaceOrder {
        PlaceOrder {
            product_id: self.product_id,
            quantity,
            delivery_destination: DeliveryDestination::Customer,
        }
    }

    pub fn complaint_on(&self, order_id: Uuid) -> FileComplaint {
        FileComplaint {
            order_id,
            reason: ComplaintReason::Damaged,
            description: "Sacks torn, rice wet".to_string(),
        }
    }

    /// One unit bought and handed to the driver
    pub async fn dispatched_order(&self) -> Order {
        let orders = &self.market.orders;
        let order = orders.place_order(&self.buyer, self.checkout(1)).await.unwrap();
        orders.advance_status(&self.seller, order.id, OrderStatus::Confirmed).await.unwrap();
        orders.advance_status(&self.seller, order.id, OrderStatus::DispatchedToLogistics).await.unwrap();
        orders.advance_status(&self.logistics, order.id, OrderStatus::DispatchedToCustomer).await.unwrap()
    }

    pub async fn balance(&self, actor: &Actor) -> i64 {
        self.market.accounts.get_balance(actor.user_id).await.unwrap()
    }

    pub async fn fund(&self, actor: &Actor, amount: i64) {
        self.market.accounts.add_funds(actor, amount, None).await.unwrap();
    }

    pub async fn register(&self, role: Role, email: &str) -> Actor {
        self.market.users.register(email, email, role, None).await.unwrap().actor()
    }

    /// Agent publishes a policy and the seller buys it
    pub async fn insure_seller(&self, premium: i64, coverage: i64, duration_days: i64) -> Insurance {
        let policy = self
            .market
            .policies
            .create_policy(
                &self.agent,
                NewPolicy { name: "Produce Transit Cover".to_string(), premium, coverage, duration_days },
            )
            .await
            .unwrap();
        if premium > 0 {
            self.fund(&self.seller, premium).await;
        }
        self.market.policies.purchase_policy(&self.seller, policy.id).await.unwrap()
    }
}

/// Memory store that records, per transaction, the order in which
/// accounts were first locked
#[derive(Clone, Default)]
pub struct LockTrace {
    inner: MemoryStore,
    transactions: Arc<Mutex<Vec<Arc<Mutex<Vec<Uuid>>>>>>,
}

impl LockTrace {
    /// Lock sequences of every transaction that locked more than one account
    pub fn multi_account_locks(&self) -> Vec<Vec<Uuid>> {
        let transactions = self.transactions.lock().unwrap();
        transactions
            .iter()
            .map(|locks| locks.lock().unwrap().clone())
            .filter(|locks| locks.len() > 1)
            .collect()
    }
}

#[async_trait]
impl Store for LockTrace {
    async fn begin(&self) -> CoreResult<Box<dyn StoreTx>> {
        let inner = self.inner.begin().await?;
        let locks = Arc::new(Mutex::new(Vec::new()));
        self.transactions.lock().unwrap().push(locks.clone());
        Ok(Box::new(TracedTx { inner, locks }))
    }
}

struct TracedTx {
    inner: Box<dyn StoreTx>,
    locks: Arc<Mutex<Vec<Uuid>>>,
}

#[async_trait]
impl StoreTx for TracedTx {
    async fn get_user(&mut self, id: Uuid) -> CoreResult<Option<User>> {
        self.inner.get_user(id).await
    }
    async fn find_user_by_email(&mut self, email: &str) -> CoreResult<Option<User>> {
        self.inner.find_user_by_email(email).await
    }
    async fn put_user(&mut self, user: &User) -> CoreResult<()> {
        self.inner.put_user(user).await
    }
    async fn list_users_by_role(&mut self, role: Role) -> CoreResult<Vec<User>> {
        self.inner.list_users_by_role(role).await
    }
    async fn get_credential(&mut self, user_id: Uuid) -> CoreResult<Option<Credential>> {
        self.inner.get_credential(user_id).await
    }
    async fn put_credential(&mut self, credential: &Credential) -> CoreResult<()> {
        self.inner.put_credential(credential).await
    }
    async fn get_product(&mut self, id: Uuid) -> CoreResult<Option<Product>> {
        self.inner.get_product(id).await
    }
    async fn put_product(&mut self, product: &Product) -> CoreResult<()> {
        self.inner.put_product(product).await
    }
    async fn list_products(&mut self, seller_id: Option<Uuid>) -> CoreResult<Vec<Product>> {
        self.inner.list_products(seller_id).await
    }
    async fn get_order(&mut self, id: Uuid) -> CoreResult<Option<Order>> {
        self.inner.get_order(id).await
    }
    async fn insert_order(&mut self, order: &Order) -> CoreResult<()> {
        self.inner.insert_order(order).await
    }
    async fn update_order(&mut self, order: &Order, expected: OrderGuard) -> CoreResult<bool> {
        self.inner.update_order(order, expected).await
    }
    async fn list_orders(&mut self, query: OrderQuery) -> CoreResult<Vec<Order>> {
        self.inner.list_orders(query).await
    }
    async fn get_complaint(&mut self, id: Uuid) -> CoreResult<Option<Complaint>> {
        self.inner.get_complaint(id).await
    }
    async fn put_complaint(&mut self, complaint: &Complaint) -> CoreResult<()> {
        self.inner.put_complaint(complaint).await
    }
    async fn list_complaints(&mut self, query: ComplaintQuery) -> CoreResult<Vec<Complaint>> {
        self.inner.list_complaints(query).await
    }
    async fn get_policy(&mut self, id: Uuid) -> CoreResult<Option<Policy>> {
        self.inner.get_policy(id).await
    }
    async fn put_policy(&mut self, policy: &Policy) -> CoreResult<()> {
        self.inner.put_policy(policy).await
    }
    async fn list_policies(&mut self) -> CoreResult<Vec<Policy>> {
        self.inner.list_policies().await
    }
    async fn get_insurance(&mut self, id: Uuid) -> CoreResult<Option<Insurance>> {
        self.inner.get_insurance(id).await
    }
    async fn put_insurance(&mut self, insurance: &Insurance) -> CoreResult<()> {
        self.inner.put_insurance(insurance).await
    }
    async fn list_insurances(&mut self, user_id: Option<Uuid>) -> CoreResult<Vec<Insurance>> {
        self.inner.list_insurances(user_id).await
    }
    async fn get_claim(&mut self, id: Uuid) -> CoreResult<Option<InsuranceClaim>> {
        self.inner.get_claim(id).await
    }
    async fn put_claim(&mut self, claim: &InsuranceClaim) -> CoreResult<()> {
        self.inner.put_claim(claim).await
    }
    async fn list_claims(&mut self, query: ClaimQuery) -> CoreResult<Vec<InsuranceClaim>> {
        self.inner.list_claims(query).await
    }
    async fn lock_account(&mut self, user_id: Uuid, now: DateTime<Utc>) -> CoreResult<Account> {
        {
            let mut locks = self.locks.lock().unwrap();
            if !locks.contains(&user_id) {
                locks.push(user_id);
            }
        }
        self.inner.lock_account(user_id, now).await
    }
    async fn put_account(&mut self, account: &Account) -> CoreResult<()> {
        self.inner.put_account(account).await
    }
    async fn list_accounts(&mut self) -> CoreResult<Vec<Account>> {
        self.inner.list_accounts().await
    }
    async fn append_transaction(&mut self, transaction: &Transaction) -> CoreResult<()> {
        self.inner.append_transaction(transaction).await
    }
    async fn list_transactions(&mut self, user_id: Uuid) -> CoreResult<Vec<Transaction>> {
        self.inner.list_transactions(user_id).await
    }
    async fn commit(self: Box<Self>) -> CoreResult<()> {
        self.inner.commit().await
    }
}
