use std::sync::Arc;
use std::net::SocketAddr;
use anyhow::Context;
use agrimart_api::{app, state::{AppState, AuthConfig}};
use agrimart_core::Store;
use agrimart_store::{Config, DbClient, MemoryStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agrimart_api=debug,agrimart_order=info,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting AgriMart API on port {}", config.server.port);

    let store: Arc<dyn Store> = match &config.database.url {
        Some(url) => {
            let db = DbClient::new(url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            Arc::new(db.store())
        }
        None => {
            tracing::warn!("No database.url configured, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let app_state = AppState::new(
        store,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        config.business_rules.clone(),
    )?;

    if let Some(email) = &config.auth.admin_email {
        let admin = app_state
            .market
            .users
            .bootstrap_admin(
                "Administrator",
                email,
                config.auth.admin_password.as_ref().map(|p| p.expose().as_str()),
            )
            .await
            .context("Failed to bootstrap admin")?;
        if config.auth.admin_password.is_none() {
            tracing::warn!(user_id = %admin.id, "Admin has no password configured and cannot log in");
        }
        tracing::info!(user_id = %admin.id, "Admin account ready");
    }

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
