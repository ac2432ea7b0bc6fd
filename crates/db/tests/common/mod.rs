//! Shared setup for repository integration tests.

use sea_orm::DatabaseConnection;

use fintrack_shared::types::UserId;

/// Returns the URL of a fresh SQLite file in the temp directory.
pub fn database_url() -> String {
    let path = std::env::temp_dir().join(format!("fintrack-it-{}.db", UserId::new()));
    format!("sqlite://{}?mode=rwc", path.display())
}

/// Connects to `url` and applies migrations.
pub async fn open(url: &str) -> DatabaseConnection {
    let db = fintrack_db::connect(url).await.unwrap();
    fintrack_db::migrate(&db).await.unwrap();
    db
}

/// A migrated database in a fresh file.
pub async fn database() -> DatabaseConnection {
    open(&database_url()).await
}
