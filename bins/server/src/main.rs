//! Fintrack API Server
//!
//! Main entry point for the Fintrack backend service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fintrack_api::{AppState, create_router};
use fintrack_db::{LedgerRepository, LedgerSettings, SystemClock, UserRepository};
use fintrack_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fintrack_api=debug,fintrack_db=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let settings = LedgerSettings::from_config(&config.ledger)?;
    info!(
        edit_window_hours = config.ledger.edit_window_hours,
        lock_timeout_ms = config.ledger.lock_timeout_ms,
        lock_max_attempts = config.ledger.lock_max_attempts,
        timezone = %settings.timezone,
        "Ledger configured"
    );

    let db = fintrack_db::connect_with(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!(max_connections = config.database.max_connections, "Database connected");
    if config.database.auto_migrate {
        fintrack_db::migrate(&db).await.context("Failed to apply migrations")?;
    }

    let jwt_service = JwtService::new(JwtConfig {
        secret: config.jwt.secret.clone(),
        access_token_expires_secs: i64::try_from(config.jwt.access_token_expiry_secs)
            .context("jwt.access_token_expiry_secs is too large")?,
    });

    let state = AppState {
        ledger: LedgerRepository::new(db.clone(), settings, Arc::new(SystemClock)),
        users: UserRepository::new(db),
        jwt_service: Arc::new(jwt_service),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
