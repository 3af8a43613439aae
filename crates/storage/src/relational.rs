use std::{fmt, time::Duration};

use async_trait::async_trait;
use kindling_domain::{Component, ComponentError, ComponentResult, Initializer};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde::Deserialize;

/// Connection settings for one SeaORM-managed pool.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection string, e.g. `sqlite::memory:` or `postgres://...`.
    #[serde(alias = "Url", alias = "dsn", alias = "Dsn")]
    pub url: String,
    #[serde(alias = "MaxConnections")]
    pub max_connections: Option<u32>,
    #[serde(alias = "MinConnections")]
    pub min_connections: Option<u32>,
    #[serde(alias = "ConnectTimeoutSecs")]
    pub connect_timeout_secs: Option<u64>,
    #[serde(alias = "IdleTimeoutSecs")]
    pub idle_timeout_secs: Option<u64>,
    #[serde(alias = "SqlxLogging")]
    pub sqlx_logging: bool,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &crate::redact_url(&self.url))
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("sqlx_logging", &self.sqlx_logging)
            .finish()
    }
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = Some(max);
        self
    }

    pub fn connect_options(&self) -> ComponentResult<ConnectOptions> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ComponentError::invalid("database url is empty"));
        }

        let mut options = ConnectOptions::new(url.to_string());
        if let Some(max) = self.max_connections {
            options.max_connections(max);
        }
        if let Some(min) = self.min_connections {
            options.min_connections(min);
        }
        if let Some(secs) = self.connect_timeout_secs {
            options.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.idle_timeout_secs {
            options.idle_timeout(Duration::from_secs(secs));
        }
        options.sqlx_logging(self.sqlx_logging);
        Ok(options)
    }
}

/// Shared relational handle; clones reuse the same pool.
#[derive(Debug, Clone)]
pub struct DatabaseClient {
    db: DatabaseConnection,
}

impl DatabaseClient {
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn ping(&self) -> ComponentResult<()> {
        self.db.ping().await.map_err(ComponentError::from_source)
    }
}

#[async_trait]
impl Initializer for DatabaseConfig {
    type Handle = DatabaseClient;

    async fn init(&self) -> ComponentResult<DatabaseClient> {
        let db = Database::connect(self.connect_options()?)
            .await
            .map_err(ComponentError::from_source)?;
        Ok(DatabaseClient { db })
    }
}

#[async_trait]
impl Component for DatabaseClient {
    async fn close(self) -> ComponentResult<()> {
        self.db.close().await.map_err(ComponentError::from_source)
    }
}
