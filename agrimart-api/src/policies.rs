use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use uuid::Uuid;
use agrimart_core::insurance::{Insurance, InsuranceStatus, Policy};
use agrimart_core::{Actor, User};
use agrimart_order::NewPolicy;

use crate::{error::AppError, state::AppState};

/// A holding with its status evaluated against the current time
#[derive(Debug, Serialize)]
struct HoldingResponse {
    #[serde(flatten)]
    holding: Insurance,
    effective_status: InsuranceStatus,
    remaining_coverage: i64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/policies", get(list_policies).post(create_policy))
        .route("/v1/policies/{id}/purchase", post(purchase_policy))
        .route("/v1/insurances", get(list_holdings))
        .route("/v1/agents", get(list_agents))
}

async fn list_policies(State(state): State<AppState>) -> Result<Json<Vec<Policy>>, AppError> {
    Ok(Json(state.market.policies.list_policies().await?))
}

async fn create_policy(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<NewPolicy>,
) -> Result<(StatusCode, Json<Policy>), AppError> {
    let policy = state.market.policies.create_policy(&actor, req).await?;
    Ok((StatusCode::CREATED, Json(policy)))
}

async fn purchase_policy(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(policy_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Insurance>), AppError> {
    let holding = state.market.policies.purchase_policy(&actor, policy_id).await?;
    Ok((StatusCode::CREATED, Json(holding)))
}

async fn list_holdings(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<HoldingResponse>>, AppError> {
    let now = state.market.now();
    let holdings = state
        .market
        .policies
        .list_holdings(&actor)
        .await?
        .into_iter()
        .map(|holding| HoldingResponse {
            effective_status: holding.effective_status(now),
            remaining_coverage: holding.remaining_coverage(),
            holding,
        })
        .collect();
    Ok(Json(holdings))
}

async fn list_agents(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.market.users.list_agents(&actor).await?))
}
