use uuid::Uuid;
use agrimart_core::{Actor, CoreError, CoreResult, Credential, Role, User};

use crate::context::WorkflowContext;
use crate::credentials;

/// Registration and lookup of marketplace participants
#[derive(Clone)]
pub struct UserDirectory {
    ctx: WorkflowContext,
}

impl UserDirectory {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self { ctx }
    }

    /// Self-service sign-up. Admins are only created by `bootstrap_admin`.
    /// Without a password the account exists but can never log in.
    pub async fn register(&self, name: &str, email: &str, role: Role, password: Option<&str>) -> CoreResult<User> {
        if role == Role::Admin {
            return Err(CoreError::Forbidden("admin accounts cannot self-register".to_string()));
        }
        self.create(name, email, role, password).await
    }

    /// Make sure an admin with this email exists. Safe to call on every start.
    /// A given password replaces the stored one, so rotating it in config
    /// takes effect on restart.
    pub async fn bootstrap_admin(&self, name: &str, email: &str, password: Option<&str>) -> CoreResult<User> {
        let password_hash = password.map(credentials::hash_password).transpose()?;
        let mut tx = self.ctx.begin().await?;
        if let Some(existing) = tx.find_user_by_email(&email.trim().to_lowercase()).await? {
            if existing.role != Role::Admin {
                return Err(CoreError::DuplicateOperation(format!(
                    "{} is already registered as {}",
                    existing.email, existing.role
                )));
            }
            if let Some(hash) = password_hash {
                tx.put_credential(&Credential::new(existing.id, hash, self.ctx.now())).await?;
                tx.commit().await?;
            }
            return Ok(existing);
        }
        drop(tx);
        self.insert(name, email, Role::Admin, password_hash).await
    }

    /// The user behind an email and password, or `None` when either is
    /// wrong or the account has no password
    pub async fn authenticate(&self, email: &str, password: &str) -> CoreResult<Option<User>> {
        let mut tx = self.ctx.begin().await?;
        let Some(user) = tx.find_user_by_email(&email.trim().to_lowercase()).await? else {
            tracing::debug!("Login for unknown email");
            return Ok(None);
        };
        let credential = tx.get_credential(user.id).await?;
        drop(tx);

        let Some(credential) = credential else {
            tracing::warn!(user_id = %user.id, role = %user.role, "Login refused, account has no password");
            return Ok(None);
        };
        if !credentials::verify_password(credential.password_hash.expose(), password)? {
            tracing::warn!(user_id = %user.id, "Login refused, wrong password");
            return Ok(None);
        }
        Ok(Some(user))
    }

    pub async fn get_user(&self, user_id: Uuid) -> CoreResult<User> {
        let mut tx = self.ctx.begin().await?;
        tx.get_user(user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("user", user_id))
    }

    /// Insurance agents in fallback order, for sellers choosing cover
    pub async fn list_agents(&self, actor: &Actor) -> CoreResult<Vec<User>> {
        if !matches!(actor.role, Role::Seller | Role::Admin) {
            return Err(CoreError::Forbidden(format!("{} users cannot browse agents", actor.role)));
        }
        let mut tx = self.ctx.begin().await?;
        tx.list_users_by_role(Role::Insurance).await
    }

    async fn create(&self, name: &str, email: &str, role: Role, password: Option<&str>) -> CoreResult<User> {
        let password_hash = password.map(credentials::hash_password).transpose()?;
        self.insert(name, email, role, password_hash).await
    }

    async fn insert(&self, name: &str, email: &str, role: Role, password_hash: Option<String>) -> CoreResult<User> {
        let now = self.ctx.now();
        let user = User::new(name, email, role, now)?;
        let mut tx = self.ctx.begin().await?;
        if tx.find_user_by_email(user.email.expose()).await?.is_some() {
            return Err(CoreError::DuplicateOperation(format!("{} is already registered", user.email)));
        }
        tx.put_user(&user).await?;
        if let Some(hash) = password_hash {
            tx.put_credential(&Credential::new(user.id, hash, now)).await?;
        }
        tx.commit().await?;

        tracing::info!(user_id = %user.id, role = %user.role, email = %user.email, "User registered");
        Ok(user)
    }
}
