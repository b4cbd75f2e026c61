use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use agrimart_catalog::{NewProduct, Product};
use agrimart_core::Actor;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
struct ProductFilter {
    seller_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct RestockRequest {
    quantity: i64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/products", get(list_products).post(create_product))
        .route("/v1/products/{id}", get(get_product))
        .route("/v1/products/{id}/restock", post(restock))
}

async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(state.market.catalog.list_products(filter.seller_id).await?))
}

async fn create_product(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let product = state.market.catalog.create_product(&actor, req).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.market.catalog.get_product(product_id).await?))
}

async fn restock(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(product_id): Path<Uuid>,
    Json(req): Json<RestockRequest>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.market.catalog.restock(&actor, product_id, req.quantity).await?))
}
