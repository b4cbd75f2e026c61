use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use agrimart_core::order::{Order, OrderStatus};
use agrimart_core::Actor;
use agrimart_order::PlaceOrder;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/orders", get(list_orders).post(place_order))
        .route("/v1/orders/{id}", get(get_order))
        .route("/v1/orders/{id}/cancel", post(cancel_order))
        .route("/v1/orders/{id}/status", post(advance_status))
}

/// GET /v1/orders
/// Orders visible to the caller's role
async fn list_orders(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(state.market.orders.list_orders(&actor).await?))
}

/// POST /v1/orders
/// Checkout
async fn place_order(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<PlaceOrder>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let order = state.market.orders.place_order(&actor, req).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn get_order(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.market.orders.get_order(&actor, order_id).await?))
}

async fn cancel_order(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.market.orders.cancel_order(&actor, order_id).await?))
}

/// POST /v1/orders/{id}/status
/// Move the order one step; `cancelled` goes through cancellation
async fn advance_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.market.orders.advance_status(&actor, order_id, req.status).await?))
}
