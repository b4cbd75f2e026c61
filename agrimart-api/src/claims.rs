use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use agrimart_core::insurance::{ClaimDecision, InsuranceClaim};
use agrimart_core::Actor;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
struct DecisionRequest {
    decision: ClaimDecision,
    comments: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/claims", get(list_claims))
        .route("/v1/claims/{id}", get(get_claim))
        .route("/v1/claims/{id}/decision", post(process_claim))
}

async fn list_claims(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<InsuranceClaim>>, AppError> {
    Ok(Json(state.market.claims.list_claims(&actor).await?))
}

async fn get_claim(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(claim_id): Path<Uuid>,
) -> Result<Json<InsuranceClaim>, AppError> {
    Ok(Json(state.market.claims.get_claim(&actor, claim_id).await?))
}

/// POST /v1/claims/{id}/decision
/// Agent verdict; repeating the same verdict is harmless
async fn process_claim(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(claim_id): Path<Uuid>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<InsuranceClaim>, AppError> {
    let claim = state
        .market
        .claims
        .process_claim(&actor, claim_id, req.decision, req.comments)
        .await?;
    Ok(Json(claim))
}
