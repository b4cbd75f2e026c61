use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres, Transaction as PgTransaction};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;
use agrimart_catalog::Product;
use agrimart_core::complaint::Complaint;
use agrimart_core::insurance::{Insurance, InsuranceClaim, Policy};
use agrimart_core::ledger::{Account, Transaction};
use agrimart_core::order::{Order, OrderGuard};
use agrimart_core::repository::{ClaimQuery, ComplaintQuery, OrderQuery};
use agrimart_core::{CoreError, CoreResult, Credential, Role, Store, StoreTx, User};

const USERS: &str = "user";
const CREDENTIALS: &str = "credential";
const PRODUCTS: &str = "product";
const ORDERS: &str = "order";
const COMPLAINTS: &str = "complaint";
const POLICIES: &str = "policy";
const INSURANCES: &str = "insurance";
const CLAIMS: &str = "claim";
const ACCOUNTS: &str = "account";

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    pub fn store(&self) -> PgStore {
        PgStore { pool: self.pool.clone() }
    }
}

fn storage(e: sqlx::Error) -> CoreError {
    tracing::error!("Database error: {}", e);
    CoreError::StorageError(e.to_string())
}

fn decode<T: DeserializeOwned>(body: Value) -> CoreResult<T> {
    serde_json::from_value(body).map_err(|e| CoreError::StorageError(format!("corrupt document: {}", e)))
}

fn encode<T: Serialize>(doc: &T) -> CoreResult<Value> {
    serde_json::to_value(doc).map_err(|e| CoreError::StorageError(format!("unencodable document: {}", e)))
}

/// Postgres system of record. Aggregates live as JSONB documents; the
/// ledger has its own table with a unique idempotency key.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> CoreResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await.map_err(storage)?;
        Ok(Box::new(PgTx { tx }))
    }
}

pub struct PgTx {
    tx: PgTransaction<'static, Postgres>,
}

impl PgTx {
    /// `lock` takes a row lock held until commit or rollback
    async fn fetch<T: DeserializeOwned>(&mut self, collection: &str, id: Uuid, lock: bool) -> CoreResult<Option<T>> {
        let sql = if lock {
            "SELECT body FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE"
        } else {
            "SELECT body FROM documents WHERE collection = $1 AND id = $2"
        };
        let body: Option<Value> = sqlx::query_scalar(sql)
            .bind(collection)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(storage)?;
        body.map(decode).transpose()
    }

    async fn upsert<T: Serialize>(&mut self, collection: &str, id: Uuid, doc: &T) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO UPDATE SET body = EXCLUDED.body, updated_at = now()
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(encode(doc)?)
        .execute(&mut *self.tx)
        .await
        .map_err(storage)?;
        Ok(())
    }

    /// `field` is always one of our own constant JSON keys
    async fn list<T: DeserializeOwned>(
        &mut self,
        collection: &str,
        filter: Option<(&'static str, String)>,
        newest_first: bool,
    ) -> CoreResult<Vec<T>> {
        let direction = if newest_first { "DESC" } else { "ASC" };
        let rows: Vec<Value> = match filter {
            Some((field, value)) => {
                let sql = format!(
                    "SELECT body FROM documents WHERE collection = $1 AND body->>'{}' = $2 ORDER BY seq {}",
                    field, direction
                );
                sqlx::query_scalar(&sql)
                    .bind(collection)
                    .bind(value)
                    .fetch_all(&mut *self.tx)
                    .await
            }
            None => {
                let sql = format!("SELECT body FROM documents WHERE collection = $1 ORDER BY seq {}", direction);
                sqlx::query_scalar(&sql)
                    .bind(collection)
                    .fetch_all(&mut *self.tx)
                    .await
            }
        }
        .map_err(storage)?;

        rows.into_iter().map(decode).collect()
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn get_user(&mut self, id: Uuid) -> CoreResult<Option<User>> {
        self.fetch(USERS, id, false).await
    }

    async fn find_user_by_email(&mut self, email: &str) -> CoreResult<Option<User>> {
        let mut users: Vec<User> = self.list(USERS, Some(("email", email.to_string())), false).await?;
        Ok(if users.is_empty() { None } else { Some(users.remove(0)) })
    }

    async fn put_user(&mut self, user: &User) -> CoreResult<()> {
        self.upsert(USERS, user.id, user).await
    }

    async fn list_users_by_role(&mut self, role: Role) -> CoreResult<Vec<User>> {
        self.list(USERS, Some(("role", role.as_str().to_string())), false).await
    }

    async fn get_credential(&mut self, user_id: Uuid) -> CoreResult<Option<Credential>> {
        self.fetch(CREDENTIALS, user_id, false).await
    }

    async fn put_credential(&mut self, credential: &Credential) -> CoreResult<()> {
        self.upsert(CREDENTIALS, credential.user_id, credential).await
    }

    async fn get_product(&mut self, id: Uuid) -> CoreResult<Option<Product>> {
        self.fetch(PRODUCTS, id, true).await
    }

    async fn put_product(&mut self, product: &Product) -> CoreResult<()> {
        self.upsert(PRODUCTS, product.id, product).await
    }

    async fn list_products(&mut self, seller_id: Option<Uuid>) -> CoreResult<Vec<Product>> {
        self.list(PRODUCTS, seller_id.map(|id| ("seller_id", id.to_string())), true).await
    }

    async fn get_order(&mut self, id: Uuid) -> CoreResult<Option<Order>> {
        self.fetch(ORDERS, id, false).await
    }

    async fn insert_order(&mut self, order: &Order) -> CoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        )
        .bind(ORDERS)
        .bind(order.id)
        .bind(encode(order)?)
        .execute(&mut *self.tx)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::DuplicateOperation(format!("order {} already exists", order.id)));
        }
        Ok(())
    }

    async fn update_order(&mut self, order: &Order, expected: OrderGuard) -> CoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE documents SET body = $3, updated_at = now()
            WHERE collection = 'order' AND id = $1
              AND body->>'status' = $2
              AND (body->>'version')::bigint = $4
            "#,
        )
        .bind(order.id)
        .bind(expected.status.as_str())
        .bind(encode(order)?)
        .bind(expected.version as i64)
        .execute(&mut *self.tx)
        .await
        .map_err(storage)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_orders(&mut self, query: OrderQuery) -> CoreResult<Vec<Order>> {
        match query {
            OrderQuery::All => self.list(ORDERS, None, true).await,
            OrderQuery::Buyer(id) => self.list(ORDERS, Some(("buyer_id", id.to_string())), true).await,
            OrderQuery::Seller(id) => self.list(ORDERS, Some(("seller_id", id.to_string())), true).await,
            OrderQuery::Status(status) => self.list(ORDERS, Some(("status", status.as_str().to_string())), true).await,
            OrderQuery::Handler(id) => {
                let rows: Vec<Value> = sqlx::query_scalar(
                    r#"
                    SELECT body FROM documents
                    WHERE collection = 'order'
                      AND (body->>'logistics_id' = $1 OR body->>'coldstorage_id' = $1 OR body->>'driver_id' = $1)
                    ORDER BY seq DESC
                    "#,
                )
                .bind(id.to_string())
                .fetch_all(&mut *self.tx)
                .await
                .map_err(storage)?;
                rows.into_iter().map(decode).collect()
            }
        }
    }

    async fn get_complaint(&mut self, id: Uuid) -> CoreResult<Option<Complaint>> {
        self.fetch(COMPLAINTS, id, true).await
    }

    async fn put_complaint(&mut self, complaint: &Complaint) -> CoreResult<()> {
        self.upsert(COMPLAINTS, complaint.id, complaint).await
    }

    async fn list_complaints(&mut self, query: ComplaintQuery) -> CoreResult<Vec<Complaint>> {
        let filter = match query {
            ComplaintQuery::All => None,
            ComplaintQuery::Buyer(id) => Some(("buyer_id", id.to_string())),
            ComplaintQuery::Seller(id) => Some(("seller_id", id.to_string())),
            ComplaintQuery::Order(id) => Some(("order_id", id.to_string())),
        };
        self.list(COMPLAINTS, filter, true).await
    }

    async fn get_policy(&mut self, id: Uuid) -> CoreResult<Option<Policy>> {
        self.fetch(POLICIES, id, false).await
    }

    async fn put_policy(&mut self, policy: &Policy) -> CoreResult<()> {
        self.upsert(POLICIES, policy.id, policy).await
    }

    async fn list_policies(&mut self) -> CoreResult<Vec<Policy>> {
        self.list(POLICIES, None, true).await
    }

    async fn get_insurance(&mut self, id: Uuid) -> CoreResult<Option<Insurance>> {
        self.fetch(INSURANCES, id, true).await
    }

    async fn put_insurance(&mut self, insurance: &Insurance) -> CoreResult<()> {
        self.upsert(INSURANCES, insurance.id, insurance).await
    }

    async fn list_insurances(&mut self, user_id: Option<Uuid>) -> CoreResult<Vec<Insurance>> {
        self.list(INSURANCES, user_id.map(|id| ("user_id", id.to_string())), true).await
    }

    async fn get_claim(&mut self, id: Uuid) -> CoreResult<Option<InsuranceClaim>> {
        self.fetch(CLAIMS, id, true).await
    }

    async fn put_claim(&mut self, claim: &InsuranceClaim) -> CoreResult<()> {
        self.upsert(CLAIMS, claim.id, claim).await
    }

    async fn list_claims(&mut self, query: ClaimQuery) -> CoreResult<Vec<InsuranceClaim>> {
        let filter = match query {
            ClaimQuery::All => None,
            ClaimQuery::Agent(id) => Some(("agent_id", id.to_string())),
            ClaimQuery::Seller(id) => Some(("seller_id", id.to_string())),
        };
        self.list(CLAIMS, filter, true).await
    }

    async fn lock_account(&mut self, user_id: Uuid, now: DateTime<Utc>) -> CoreResult<Account> {
        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING")
            .bind(ACCOUNTS)
            .bind(user_id)
            .bind(encode(&Account::open(user_id, now))?)
            .execute(&mut *self.tx)
            .await
            .map_err(storage)?;

        self.fetch(ACCOUNTS, user_id, true)
            .await?
            .ok_or_else(|| CoreError::StorageError(format!("account {} vanished under lock", user_id)))
    }

    async fn put_account(&mut self, account: &Account) -> CoreResult<()> {
        self.upsert(ACCOUNTS, account.user_id, account).await
    }

    async fn list_accounts(&mut self) -> CoreResult<Vec<Account>> {
        self.list(ACCOUNTS, None, false).await
    }

    async fn append_transaction(&mut self, transaction: &Transaction) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO ledger_transactions (id, user_id, idempotency_key, amount, body)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(transaction.id)
        .bind(transaction.user_id)
        .bind(&transaction.idempotency_key)
        .bind(transaction.amount)
        .bind(encode(transaction)?)
        .execute(&mut *self.tx)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::DuplicateOperation(format!(
                "transaction {} already recorded",
                transaction.idempotency_key
            )));
        }
        Ok(())
    }

    async fn list_transactions(&mut self, user_id: Uuid) -> CoreResult<Vec<Transaction>> {
        let rows: Vec<Value> = sqlx::query_scalar(
            "SELECT body FROM ledger_transactions WHERE user_id = $1 ORDER BY seq DESC",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(storage)?;
        rows.into_iter().map(decode).collect()
    }

    async fn commit(self: Box<Self>) -> CoreResult<()> {
        self.tx.commit().await.map_err(storage)
    }
}
