use serde::{Deserialize, Serialize};
use agrimart_shared::Masked;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{CoreError, CoreResult};

/// Dashboard roles. Each order edge is handled by exactly one of them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Buyer,
    Seller,
    Logistics,
    Coldstorage,
    Driver,
    Insurance,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
            Role::Logistics => "logistics",
            Role::Coldstorage => "coldstorage",
            Role::Driver => "driver",
            Role::Insurance => "insurance",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            "logistics" => Ok(Role::Logistics),
            "coldstorage" => Ok(Role::Coldstorage),
            "driver" => Ok(Role::Driver),
            "insurance" => Ok(Role::Insurance),
            "admin" => Ok(Role::Admin),
            other => Err(CoreError::ValidationError(format!("unknown role: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: Masked<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: &str, email: &str, role: Role, now: DateTime<Utc>) -> CoreResult<Self> {
        let name = name.trim();
        let email = email.trim().to_lowercase();
        if name.is_empty() {
            return Err(CoreError::ValidationError("name must not be empty".to_string()));
        }
        if !email.contains('@') {
            return Err(CoreError::ValidationError("email is not valid".to_string()));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: Masked::new(email),
            role,
            created_at: now,
        })
    }

    pub fn actor(&self) -> Actor {
        Actor { user_id: self.id, role: self.role }
    }
}

/// A user's login secret, kept apart from the profile so it never rides
/// along in API responses. `password_hash` is a PHC string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credential {
    pub user_id: Uuid,
    pub password_hash: Masked<String>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(user_id: Uuid, password_hash: String, now: DateTime<Utc>) -> Self {
        Self { user_id, password_hash: Masked::new(password_hash), updated_at: now }
    }
}

/// The authenticated caller of a workflow operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_role(&self, role: Role) -> CoreResult<()> {
        if self.role != role {
            return Err(CoreError::Forbidden(format!(
                "{} role required, caller is {}",
                role, self.role
            )));
        }
        Ok(())
    }

    /// Caller must be `owner` acting in `role`
    pub fn require_owner(&self, role: Role, owner: Uuid) -> CoreResult<()> {
        self.require_role(role)?;
        if self.user_id != owner {
            return Err(CoreError::Forbidden(format!("{} {} does not own this record", role, self.user_id)));
        }
        Ok(())
    }
}
