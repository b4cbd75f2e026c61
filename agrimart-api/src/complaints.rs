use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use agrimart_core::complaint::{Complaint, ComplaintResolution};
use agrimart_core::insurance::InsuranceClaim;
use agrimart_core::Actor;
use agrimart_order::FileComplaint;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Default, Deserialize)]
struct CancelRequest {
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    resolution: ComplaintResolution,
    note: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/complaints", get(list_complaints).post(file_complaint))
        .route("/v1/complaints/{id}", get(get_complaint))
        .route("/v1/complaints/{id}/cancel", post(cancel_complaint))
        .route("/v1/complaints/{id}/resolve", post(resolve_complaint))
        .route("/v1/complaints/{id}/claim", post(file_claim))
}

async fn list_complaints(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Complaint>>, AppError> {
    Ok(Json(state.market.complaints.list_complaints(&actor).await?))
}

async fn file_complaint(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<FileComplaint>,
) -> Result<(StatusCode, Json<Complaint>), AppError> {
    let complaint = state.market.complaints.file_complaint(&actor, req).await?;
    Ok((StatusCode::CREATED, Json(complaint)))
}

async fn get_complaint(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(complaint_id): Path<Uuid>,
) -> Result<Json<Complaint>, AppError> {
    Ok(Json(state.market.complaints.get_complaint(&actor, complaint_id).await?))
}

async fn cancel_complaint(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(complaint_id): Path<Uuid>,
    req: Option<Json<CancelRequest>>,
) -> Result<Json<Complaint>, AppError> {
    let reason = req.and_then(|Json(req)| req.reason);
    Ok(Json(state.market.complaints.cancel_complaint(&actor, complaint_id, reason).await?))
}

/// POST /v1/complaints/{id}/resolve
/// Seller settles directly: accept, refund or reject
async fn resolve_complaint(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(complaint_id): Path<Uuid>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<Complaint>, AppError> {
    let complaint = state
        .market
        .complaints
        .resolve_complaint(&actor, complaint_id, req.resolution, req.note)
        .await?;
    Ok(Json(complaint))
}

/// POST /v1/complaints/{id}/claim
/// Seller escalates to their insurer
async fn file_claim(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(complaint_id): Path<Uuid>,
) -> Result<(StatusCode, Json<InsuranceClaim>), AppError> {
    let claim = state.market.claims.file_claim(&actor, complaint_id).await?;
    Ok((StatusCode::CREATED, Json(claim)))
}
