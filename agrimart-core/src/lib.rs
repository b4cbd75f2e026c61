pub mod clock;
pub mod complaint;
pub mod events;
pub mod identity;
pub mod insurance;
pub mod ledger;
pub mod order;
pub mod repository;

use agrimart_catalog::{InventoryError, ProductError};
use uuid::Uuid;

pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::{Actor, Credential, Role, User};
pub use repository::{Store, StoreTx};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },
    #[error("No active insurance policy for seller {0}")]
    NoActivePolicy(Uuid),
    #[error("No insurance agent available")]
    NoAgentAvailable,
    #[error("Duplicate operation: {0}")]
    DuplicateOperation(String),
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    pub fn transition(from: impl ToString, to: impl ToString) -> Self {
        Self::InvalidStateTransition { from: from.to_string(), to: to.to_string() }
    }

    /// Stable machine-readable name, used in API error bodies and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::ValidationError(_) => "validation_error",
            CoreError::NotFound { .. } => "not_found",
            CoreError::InvalidStateTransition { .. } => "invalid_state_transition",
            CoreError::Forbidden(_) => "forbidden",
            CoreError::InsufficientFunds { .. } => "insufficient_funds",
            CoreError::NoActivePolicy(_) => "no_active_policy",
            CoreError::NoAgentAvailable => "no_agent_available",
            CoreError::DuplicateOperation(_) => "duplicate_operation",
            CoreError::StorageError(_) => "storage_error",
        }
    }
}

impl From<ProductError> for CoreError {
    fn from(err: ProductError) -> Self {
        CoreError::ValidationError(err.to_string())
    }
}

impl From<InventoryError> for CoreError {
    fn from(err: InventoryError) -> Self {
        CoreError::ValidationError(err.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
