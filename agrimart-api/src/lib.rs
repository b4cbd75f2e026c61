use axum::{
    routing::get,
    Router,
    http::Method,
    Json,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod account;
pub mod admin;
pub mod auth;
pub mod claims;
pub mod complaints;
pub mod error;
pub mod events;
pub mod metrics;
pub mod middleware;
pub mod orders;
pub mod policies;
pub mod products;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    // Everything under here needs a bearer token
    let protected = Router::new()
        .merge(products::routes())
        .merge(orders::routes())
        .merge(complaints::routes())
        .merge(claims::routes())
        .merge(policies::routes())
        .merge(account::routes())
        .merge(admin::routes())
        .merge(events::routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::actor_auth_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics::metrics_handler))
        .merge(auth::routes())
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
