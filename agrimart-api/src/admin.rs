use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;
use uuid::Uuid;
use agrimart_core::{Actor, CoreError, User};
use agrimart_order::BalanceAudit;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize)]
struct ReconcileResponse {
    accounts: usize,
    mismatches: usize,
    report: Vec<BalanceAudit>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/reconcile", get(reconcile))
        .route("/v1/admin/users/{id}", get(get_user))
}

/// GET /v1/admin/reconcile
/// Recompute every balance from the ledger
async fn reconcile(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ReconcileResponse>, AppError> {
    let report = state.market.accounts.reconcile(&actor).await?;
    let mismatches = report.iter().filter(|a| !a.consistent).count();
    if mismatches > 0 {
        tracing::warn!(mismatches, "Reconciliation found inconsistent accounts");
    }
    Ok(Json(ReconcileResponse { accounts: report.len(), mismatches, report }))
}

async fn get_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    if !actor.is_admin() {
        return Err(CoreError::Forbidden("user lookup is an admin command".to_string()).into());
    }
    Ok(Json(state.market.users.get_user(user_id).await?))
}
