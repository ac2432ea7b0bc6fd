//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Ledger behaviour.
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL, `sqlite://` or `postgres://`.
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of pooled connections.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Apply pending migrations on startup.
    #[serde(default = "default_auto_migrate")]
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            auto_migrate: default_auto_migrate(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://fintrack.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_auto_migrate() -> bool {
    true
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

/// JWT settings as read from configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    86_400 // 1 day
}

/// Ledger configuration: edit window, lock discipline and reference timezone.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Hours after creation during which a transaction may be amended or removed.
    #[serde(default = "default_edit_window_hours")]
    pub edit_window_hours: u32,
    /// How long a single lock acquisition attempt may wait.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Number of acquisition attempts before giving up with a conflict.
    #[serde(default = "default_lock_max_attempts")]
    pub lock_max_attempts: u32,
    /// Initial pause between attempts; doubled after every failed attempt.
    #[serde(default = "default_lock_backoff_ms")]
    pub lock_backoff_ms: u64,
    /// IANA timezone used for calendar periods and date-only filters.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            edit_window_hours: default_edit_window_hours(),
            lock_timeout_ms: default_lock_timeout_ms(),
            lock_max_attempts: default_lock_max_attempts(),
            lock_backoff_ms: default_lock_backoff_ms(),
            timezone: default_timezone(),
        }
    }
}

fn default_edit_window_hours() -> u32 {
    12
}

fn default_lock_timeout_ms() -> u64 {
    250
}

fn default_lock_max_attempts() -> u32 {
    3
}

fn default_lock_backoff_ms() -> u64 {
    10
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("FINTRACK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_defaults() {
        let ledger = LedgerConfig::default();
        assert_eq!(ledger.edit_window_hours, 12);
        assert_eq!(ledger.lock_max_attempts, 3);
        assert_eq!(ledger.timezone, "UTC");
    }

    #[test]
    fn test_database_defaults() {
        let database = DatabaseConfig::default();
        assert_eq!(database.url, "sqlite://fintrack.db?mode=rwc");
        assert_eq!(database.min_connections, 1);
        assert!(database.auto_migrate);
    }

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("FINTRACK__JWT__SECRET", Some("env-secret")),
                ("FINTRACK__SERVER__PORT", Some("6001")),
                ("FINTRACK__LEDGER__TIMEZONE", Some("Asia/Kolkata")),
                ("FINTRACK__DATABASE__URL", Some("postgres://localhost/fintrack")),
                ("RUN_MODE", Some("test-does-not-exist")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.jwt.secret, "env-secret");
                assert_eq!(config.jwt.access_token_expiry_secs, 86_400);
                assert_eq!(config.server.port, 6001);
                assert_eq!(config.server.host, "0.0.0.0");
                assert_eq!(config.ledger.timezone, "Asia/Kolkata");
                assert_eq!(config.ledger.edit_window_hours, 12);
                assert_eq!(config.database.url, "postgres://localhost/fintrack");
                assert_eq!(config.database.max_connections, 10);
                assert!(config.database.auto_migrate);
            },
        );
    }

    #[test]
    fn test_missing_secret_fails() {
        temp_env::with_vars(
            [
                ("FINTRACK__JWT__SECRET", None::<&str>),
                ("RUN_MODE", Some("test-does-not-exist")),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }
}
