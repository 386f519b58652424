//! Database primitives: env-driven settings and the shared sea-orm pool.

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use thiserror::Error;
use tracing::info;

/// Shared connection pool alias.
pub type DbPool = DatabaseConnection;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing (set {0})")]
    MissingUrl(String),
    #[error("invalid value for {key}: {value}")]
    InvalidSetting { key: &'static str, value: String },
    #[error("database connection failed: {0}")]
    Connect(#[from] DbErr),
}

pub type DbResult<T> = Result<T, DbError>;

#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub sql_logging: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout_secs() -> u64 {
    5
}

impl DatabaseSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
            sql_logging: false,
        }
    }

    /// Reads `DATABASE_URL` plus the optional `DB_*` tuning knobs.
    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DbResult<Self> {
        let url = lookup("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| DbError::MissingUrl("DATABASE_URL".into()))?;
        let mut settings = Self::new(url);
        if let Some(raw) = lookup("DB_MAX_CONNECTIONS") {
            settings.max_connections = parse_setting("DB_MAX_CONNECTIONS", &raw)?;
        }
        if let Some(raw) = lookup("DB_MIN_CONNECTIONS") {
            settings.min_connections = parse_setting("DB_MIN_CONNECTIONS", &raw)?;
        }
        if let Some(raw) = lookup("DB_CONNECT_TIMEOUT_SECS") {
            settings.connect_timeout_secs = parse_setting("DB_CONNECT_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("DB_SQL_LOGGING") {
            settings.sql_logging = matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(settings)
    }

    fn connect_options(&self) -> ConnectOptions {
        // Every connection to an in-memory sqlite url opens a fresh database.
        let max_connections = if self.url.starts_with("sqlite::memory:") {
            1
        } else {
            self.max_connections
        };
        let mut options = ConnectOptions::new(self.url.clone());
        options
            .max_connections(max_connections)
            .min_connections(self.min_connections.min(max_connections))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .sqlx_logging(self.sql_logging);
        options
    }
}

fn parse_setting<T: std::str::FromStr>(key: &'static str, raw: &str) -> DbResult<T> {
    raw.trim().parse().map_err(|_| DbError::InvalidSetting {
        key,
        value: raw.to_string(),
    })
}

/// Open the pool described by `settings`.
pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let pool = Database::connect(settings.connect_options()).await?;
    info!(
        backend = ?pool.get_database_backend(),
        max_connections = settings.max_connections,
        "database pool ready"
    );
    Ok(pool)
}
