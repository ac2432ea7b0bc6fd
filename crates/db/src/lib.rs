//! Database layer with `SeaORM` entities, migrations and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Database migrations
//! - Per-owner ledger books behind bounded locks, persisted per unit of work
//! - User records for authentication
//! - The clock used to evaluate edit windows and summary periods

pub mod clock;
pub mod entities;
pub mod migration;
pub mod repositories;

pub use clock::{Clock, ManualClock, SystemClock};
pub use repositories::{
    InvalidTimezone, LedgerRepository, LedgerSettings, StoreError, UserError, UserRecord,
    UserRepository,
};

use fintrack_shared::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use migration::Migrator;

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection as described by `config`.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);
    Database::connect(options).await
}

/// Applies every pending migration.
///
/// # Errors
///
/// Returns an error if a migration fails.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    Migrator::up(db, None).await?;
    info!("Database migrations applied");
    Ok(())
}

/// Opens a migrated database in a fresh temporary file.
#[cfg(test)]
pub(crate) async fn test_database() -> DatabaseConnection {
    let name = format!("fintrack-unit-{}.db", fintrack_shared::types::UserId::new());
    let path = std::env::temp_dir().join(name);
    let db = connect(&format!("sqlite://{}?mode=rwc", path.display()))
        .await
        .unwrap();
    migrate(&db).await.unwrap();
    db
}
