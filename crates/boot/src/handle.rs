use async_trait::async_trait;
use kindling_cache::RedisClient;
use kindling_domain::{Component, ComponentResult, Family, LoggerClient};
use kindling_storage::{DatabaseClient, TDengineClient};

/// Any live component held by the registry.
#[derive(Debug, Clone)]
pub enum Handle {
    Logger(LoggerClient),
    Redis(RedisClient),
    Database(DatabaseClient),
    TDengine(TDengineClient),
}

impl Handle {
    pub fn family(&self) -> Family {
        match self {
            Self::Logger(_) => Family::Logger,
            Self::Redis(_) => Family::Cache,
            Self::Database(_) => Family::Relational,
            Self::TDengine(_) => Family::TimeSeries,
        }
    }

    pub fn as_logger(&self) -> Option<&LoggerClient> {
        match self {
            Self::Logger(logger) => Some(logger),
            _ => None,
        }
    }

    pub fn as_redis(&self) -> Option<&RedisClient> {
        match self {
            Self::Redis(client) => Some(client),
            _ => None,
        }
    }

    pub fn as_database(&self) -> Option<&DatabaseClient> {
        match self {
            Self::Database(client) => Some(client),
            _ => None,
        }
    }

    pub fn as_tdengine(&self) -> Option<&TDengineClient> {
        match self {
            Self::TDengine(client) => Some(client),
            _ => None,
        }
    }
}

impl From<LoggerClient> for Handle {
    fn from(value: LoggerClient) -> Self {
        Self::Logger(value)
    }
}

impl From<RedisClient> for Handle {
    fn from(value: RedisClient) -> Self {
        Self::Redis(value)
    }
}

impl From<DatabaseClient> for Handle {
    fn from(value: DatabaseClient) -> Self {
        Self::Database(value)
    }
}

impl From<TDengineClient> for Handle {
    fn from(value: TDengineClient) -> Self {
        Self::TDengine(value)
    }
}

#[async_trait]
impl Component for Handle {
    async fn close(self) -> ComponentResult<()> {
        match self {
            Self::Logger(logger) => logger.close().await,
            Self::Redis(client) => client.close().await,
            Self::Database(client) => client.close().await,
            Self::TDengine(client) => client.close().await,
        }
    }
}
