use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json,
    Router,
};
use serde::{Deserialize, Serialize};
use agrimart_core::{Role, User};
use agrimart_shared::Masked;

use crate::{error::AppError, middleware::auth::issue_token, state::AppState};

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    name: String,
    email: String,
    role: Role,
    password: Masked<String>,
}

#[derive(Debug, Deserialize)]
struct TokenRequest {
    email: String,
    password: Masked<String>,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    user: User,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/register", post(register))
        .route("/v1/auth/token", post(token))
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let user = state
        .market
        .users
        .register(&req.name, &req.email, req.role, Some(req.password.expose().as_str()))
        .await?;
    let token = issue_token(&state.auth, user.actor())?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

async fn token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state
        .market
        .users
        .authenticate(&req.email, req.password.expose())
        .await?
        .ok_or_else(|| AppError::AuthenticationError("invalid email or password".to_string()))?;
    let token = issue_token(&state.auth, user.actor())?;
    Ok(Json(AuthResponse { token, user }))
}
