use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use agrimart_core::ledger::Transaction;
use agrimart_core::Actor;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize)]
struct BalanceResponse {
    user_id: Uuid,
    balance: i64,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct AddFundsRequest {
    amount: i64,
    /// Client-chosen id; retrying with the same id never pays twice
    request_id: Option<Uuid>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/account/balance", get(get_balance))
        .route("/v1/account/transactions", get(get_transactions))
        .route("/v1/account/funds", post(add_funds))
}

async fn get_balance(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<BalanceResponse>, AppError> {
    let balance = state.market.accounts.get_balance(actor.user_id).await?;
    Ok(Json(BalanceResponse {
        user_id: actor.user_id,
        balance,
        currency: state.business_rules.currency.clone(),
    }))
}

async fn get_transactions(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    Ok(Json(state.market.accounts.get_transactions(actor.user_id).await?))
}

async fn add_funds(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<AddFundsRequest>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let entry = state.market.accounts.add_funds(&actor, req.amount, req.request_id).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}
