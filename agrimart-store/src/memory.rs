use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;
use agrimart_catalog::Product;
use agrimart_core::complaint::Complaint;
use agrimart_core::insurance::{Insurance, InsuranceClaim, Policy};
use agrimart_core::ledger::{Account, Transaction};
use agrimart_core::order::{Order, OrderGuard};
use agrimart_core::repository::{ClaimQuery, ComplaintQuery, OrderQuery};
use agrimart_core::{CoreError, CoreResult, Credential, Role, Store, StoreTx, User};

/// Rows keyed by id, remembering insertion order
#[derive(Debug, Clone)]
struct Table<T> {
    rows: HashMap<Uuid, T>,
    order: Vec<Uuid>,
}

impl<T: Clone> Table<T> {
    fn get(&self, id: Uuid) -> Option<T> {
        self.rows.get(&id).cloned()
    }

    fn contains(&self, id: Uuid) -> bool {
        self.rows.contains_key(&id)
    }

    fn put(&mut self, id: Uuid, row: T) {
        if self.rows.insert(id, row).is_none() {
            self.order.push(id);
        }
    }

    /// Oldest first
    fn oldest<F: Fn(&T) -> bool>(&self, keep: F) -> Vec<T> {
        self.order
            .iter()
            .filter_map(|id| self.rows.get(id))
            .filter(|row| keep(row))
            .cloned()
            .collect()
    }

    fn newest<F: Fn(&T) -> bool>(&self, keep: F) -> Vec<T> {
        let mut rows = self.oldest(keep);
        rows.reverse();
        rows
    }
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self { rows: HashMap::new(), order: Vec::new() }
    }
}

#[derive(Debug, Clone, Default)]
struct Collections {
    users: Table<User>,
    credentials: Table<Credential>,
    products: Table<Product>,
    orders: Table<Order>,
    complaints: Table<Complaint>,
    policies: Table<Policy>,
    insurances: Table<Insurance>,
    claims: Table<InsuranceClaim>,
    accounts: Table<Account>,
    transactions: Vec<Transaction>,
    idempotency_keys: HashSet<String>,
}

/// Process-local store for development and tests.
///
/// A transaction holds the single lock for its whole life and works on a
/// private copy, so transactions are fully serialized and a dropped one
/// leaves no trace.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> CoreResult<Box<dyn StoreTx>> {
        let guard = self.inner.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Collections>,
    work: Collections,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn get_user(&mut self, id: Uuid) -> CoreResult<Option<User>> {
        Ok(self.work.users.get(id))
    }

    async fn find_user_by_email(&mut self, email: &str) -> CoreResult<Option<User>> {
        Ok(self.work.users.oldest(|u| u.email.expose() == email).into_iter().next())
    }

    async fn put_user(&mut self, user: &User) -> CoreResult<()> {
        self.work.users.put(user.id, user.clone());
        Ok(())
    }

    async fn list_users_by_role(&mut self, role: Role) -> CoreResult<Vec<User>> {
        Ok(self.work.users.oldest(|u| u.role == role))
    }

    async fn get_credential(&mut self, user_id: Uuid) -> CoreResult<Option<Credential>> {
        Ok(self.work.credentials.get(user_id))
    }

    async fn put_credential(&mut self, credential: &Credential) -> CoreResult<()> {
        self.work.credentials.put(credential.user_id, credential.clone());
        Ok(())
    }

    async fn get_product(&mut self, id: Uuid) -> CoreResult<Option<Product>> {
        Ok(self.work.products.get(id))
    }

    async fn put_product(&mut self, product: &Product) -> CoreResult<()> {
        self.work.products.put(product.id, product.clone());
        Ok(())
    }

    async fn list_products(&mut self, seller_id: Option<Uuid>) -> CoreResult<Vec<Product>> {
        Ok(self.work.products.newest(|p| seller_id.map_or(true, |s| p.seller_id == s)))
    }

    async fn get_order(&mut self, id: Uuid) -> CoreResult<Option<Order>> {
        Ok(self.work.orders.get(id))
    }

    async fn insert_order(&mut self, order: &Order) -> CoreResult<()> {
        if self.work.orders.contains(order.id) {
            return Err(CoreError::DuplicateOperation(format!("order {} already exists", order.id)));
        }
        self.work.orders.put(order.id, order.clone());
        Ok(())
    }

    async fn update_order(&mut self, order: &Order, expected: OrderGuard) -> CoreResult<bool> {
        match self.work.orders.get(order.id) {
            Some(stored) if stored.guard() == expected => {
                self.work.orders.put(order.id, order.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_orders(&mut self, query: OrderQuery) -> CoreResult<Vec<Order>> {
        Ok(self.work.orders.newest(|o| match query {
            OrderQuery::All => true,
            OrderQuery::Buyer(id) => o.buyer_id == id,
            OrderQuery::Seller(id) => o.seller_id == id,
            OrderQuery::Status(status) => o.status == status,
            OrderQuery::Handler(id) => {
                o.logistics_id == Some(id) || o.coldstorage_id == Some(id) || o.driver_id == Some(id)
            }
        }))
    }

    async fn get_complaint(&mut self, id: Uuid) -> CoreResult<Option<Complaint>> {
        Ok(self.work.complaints.get(id))
    }

    async fn put_complaint(&mut self, complaint: &Complaint) -> CoreResult<()> {
        self.work.complaints.put(complaint.id, complaint.clone());
        Ok(())
    }

    async fn list_complaints(&mut self, query: ComplaintQuery) -> CoreResult<Vec<Complaint>> {
        Ok(self.work.complaints.newest(|c| match query {
            ComplaintQuery::All => true,
            ComplaintQuery::Buyer(id) => c.buyer_id == id,
            ComplaintQuery::Seller(id) => c.seller_id == id,
            ComplaintQuery::Order(id) => c.order_id == id,
        }))
    }

    async fn get_policy(&mut self, id: Uuid) -> CoreResult<Option<Policy>> {
        Ok(self.work.policies.get(id))
    }

    async fn put_policy(&mut self, policy: &Policy) -> CoreResult<()> {
        self.work.policies.put(policy.id, policy.clone());
        Ok(())
    }

    async fn list_policies(&mut self) -> CoreResult<Vec<Policy>> {
        Ok(self.work.policies.newest(|_| true))
    }

    async fn get_insurance(&mut self, id: Uuid) -> CoreResult<Option<Insurance>> {
        Ok(self.work.insurances.get(id))
    }

    async fn put_insurance(&mut self, insurance: &Insurance) -> CoreResult<()> {
        self.work.insurances.put(insurance.id, insurance.clone());
        Ok(())
    }

    async fn list_insurances(&mut self, user_id: Option<Uuid>) -> CoreResult<Vec<Insurance>> {
        Ok(self.work.insurances.newest(|i| user_id.map_or(true, |u| i.user_id == u)))
    }

    async fn get_claim(&mut self, id: Uuid) -> CoreResult<Option<InsuranceClaim>> {
        Ok(self.work.claims.get(id))
    }

    async fn put_claim(&mut self, claim: &InsuranceClaim) -> CoreResult<()> {
        self.work.claims.put(claim.id, claim.clone());
        Ok(())
    }

    async fn list_claims(&mut self, query: ClaimQuery) -> CoreResult<Vec<InsuranceClaim>> {
        Ok(self.work.claims.newest(|c| match query {
            ClaimQuery::All => true,
            ClaimQuery::Agent(id) => c.agent_id == id,
            ClaimQuery::Seller(id) => c.seller_id == id,
        }))
    }

    async fn lock_account(&mut self, user_id: Uuid, now: DateTime<Utc>) -> CoreResult<Account> {
        if let Some(account) = self.work.accounts.get(user_id) {
            return Ok(account);
        }
        let account = Account::open(user_id, now);
        self.work.accounts.put(user_id, account.clone());
        Ok(account)
    }

    async fn put_account(&mut self, account: &Account) -> CoreResult<()> {
        self.work.accounts.put(account.user_id, account.clone());
        Ok(())
    }

    async fn list_accounts(&mut self) -> CoreResult<Vec<Account>> {
        Ok(self.work.accounts.oldest(|_| true))
    }

    async fn append_transaction(&mut self, transaction: &Transaction) -> CoreResult<()> {
        if !self.work.idempotency_keys.insert(transaction.idempotency_key.clone()) {
            return Err(CoreError::DuplicateOperation(format!(
                "transaction {} already recorded",
                transaction.idempotency_key
            )));
        }
        self.work.transactions.push(transaction.clone());
        Ok(())
    }

    async fn list_transactions(&mut self, user_id: Uuid) -> CoreResult<Vec<Transaction>> {
        Ok(self
            .work
            .transactions
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn commit(self: Box<Self>) -> CoreResult<()> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrimart_catalog::{NewProduct, ProductCategory};
    use agrimart_core::ledger::TransactionKind;
    use agrimart_core::order::{DeliveryDestination, OrderStatus};

    async fn user(store: &MemoryStore, email: &str, role: Role) -> User {
        let user = User::new(email, email, role, Utc::now()).unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.put_user(&user).await.unwrap();
        tx.commit().await.unwrap();
        user
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = MemoryStore::new();
        let buyer = user(&store, "buyer@example.in", Role::Buyer).await;

        {
            let mut tx = store.begin().await.unwrap();
            let mut account = tx.lock_account(buyer.id, Utc::now()).await.unwrap();
            account.apply(500, Utc::now()).unwrap();
            tx.put_account(&account).await.unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.lock_account(buyer.id, Utc::now()).await.unwrap().balance, 0);
    }

    #[tokio::test]
    async fn test_stale_guard_leaves_order_untouched() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let product = Product::new(
            Uuid::new_v4(),
            NewProduct {
                name: "Alphonso Mango".to_string(),
                category: ProductCategory::Fruits,
                unit: "dozen".to_string(),
                price: 600,
                stock: 40,
            },
            now,
        )
        .unwrap();
        let placed = Order::place(Uuid::new_v4(), &product, 1, DeliveryDestination::Customer, now).unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&placed).await.unwrap();
        tx.commit().await.unwrap();

        let mut confirmed = placed.clone();
        confirmed.transition(OrderStatus::Confirmed, placed.seller_id, now).unwrap();

        let wrong_version = OrderGuard { status: OrderStatus::Pending, version: placed.version + 1 };
        let wrong_status = OrderGuard { status: OrderStatus::Confirmed, version: placed.version };

        let mut tx = store.begin().await.unwrap();
        assert!(!tx.update_order(&confirmed, wrong_version).await.unwrap());
        assert!(!tx.update_order(&confirmed, wrong_status).await.unwrap());
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let stored = tx.get_order(placed.id).await.unwrap().unwrap();
        assert_eq!(stored, placed);
        assert_eq!(stored.status, OrderStatus::Pending);

        assert!(tx.update_order(&confirmed, placed.guard()).await.unwrap());
        assert_eq!(tx.get_order(placed.id).await.unwrap().unwrap().status, OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_account_opened_at_given_time() {
        let store = MemoryStore::new();
        let opened = Utc::now() - chrono::Duration::days(30);
        let user_id = Uuid::new_v4();

        let mut tx = store.begin().await.unwrap();
        let account = tx.lock_account(user_id, opened).await.unwrap();
        assert_eq!(account.updated_at, opened);
        assert_eq!(account.balance, 0);
    }

    #[tokio::test]
    async fn test_reused_idempotency_key_rejected() {
        let store = MemoryStore::new();
        let related = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let first = Transaction::new(user_id, TransactionKind::FundAddition, 100, related, "top up", Utc::now());
        let second = Transaction::new(user_id, TransactionKind::FundAddition, 100, related, "top up", Utc::now());

        let mut tx = store.begin().await.unwrap();
        tx.append_transaction(&first).await.unwrap();
        let result = tx.append_transaction(&second).await;
        assert!(matches!(result, Err(CoreError::DuplicateOperation(_))));
        assert_eq!(tx.list_transactions(user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_roles_listed_oldest_first() {
        let store = MemoryStore::new();
        let first = user(&store, "first@cover.in", Role::Insurance).await;
        user(&store, "seller@farm.in", Role::Seller).await;
        let second = user(&store, "second@cover.in", Role::Insurance).await;

        let mut tx = store.begin().await.unwrap();
        let agents = tx.list_users_by_role(Role::Insurance).await.unwrap();
        assert_eq!(agents.iter().map(|u| u.id).collect::<Vec<_>>(), vec![first.id, second.id]);
        assert!(tx.find_user_by_email("seller@farm.in").await.unwrap().is_some());
    }
}
