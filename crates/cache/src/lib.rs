//! Redis-backed cache family.
//!
//! Building a [`RedisClient`] only validates the address; connections are
//! opened on demand through [`RedisClient::connection`].

use std::fmt;

use async_trait::async_trait;
use kindling_domain::{Component, ComponentError, ComponentResult, Initializer};
use redis::{aio::MultiplexedConnection, Client, ConnectionInfo, IntoConnectionInfo};
use serde::Deserialize;

#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// `host:port` or a full `redis://` / `rediss://` / `redis+unix://` URL.
    #[serde(alias = "Addr")]
    pub addr: String,
    #[serde(alias = "DB")]
    pub db: Option<i64>,
    #[serde(alias = "Username")]
    pub username: Option<String>,
    #[serde(alias = "Password")]
    pub password: Option<String>,
}

impl fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisConfig")
            .field("addr", &redact_userinfo(&self.addr))
            .field("db", &self.db)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Masks the `user:password@` part of a URL-style address.
fn redact_userinfo(addr: &str) -> String {
    let Some(scheme_end) = addr.find("://").map(|i| i + 3) else {
        return addr.to_string();
    };
    let authority_end = addr[scheme_end..]
        .find('/')
        .map_or(addr.len(), |i| scheme_end + i);
    match addr[scheme_end..authority_end].rfind('@') {
        Some(at) => format!("{}***{}", &addr[..scheme_end], &addr[scheme_end + at..]),
        None => addr.to_string(),
    }
}

impl RedisConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Self::default()
        }
    }

    fn connection_info(&self) -> ComponentResult<ConnectionInfo> {
        let addr = self.addr.trim();
        if addr.is_empty() {
            return Err(ComponentError::invalid("redis address is empty"));
        }
        let url = if addr.contains("://") {
            addr.to_string()
        } else {
            format!("redis://{addr}")
        };

        let mut info = url
            .as_str()
            .into_connection_info()
            .map_err(ComponentError::from_source)?;
        if let Some(db) = self.db {
            info.redis.db = db;
        }
        if let Some(username) = &self.username {
            info.redis.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            info.redis.password = Some(password.clone());
        }
        Ok(info)
    }
}

#[derive(Clone)]
pub struct RedisClient {
    client: Client,
}

impl fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = self.client.get_connection_info();
        f.debug_struct("RedisClient")
            .field("addr", &info.addr.to_string())
            .field("db", &info.redis.db)
            .finish_non_exhaustive()
    }
}

impl RedisClient {
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn connection_info(&self) -> &ConnectionInfo {
        self.client.get_connection_info()
    }

    /// Opens a multiplexed connection; clones of it share one socket.
    pub async fn connection(&self) -> ComponentResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(ComponentError::from_source)
    }
}

#[async_trait]
impl Initializer for RedisConfig {
    type Handle = RedisClient;

    async fn init(&self) -> ComponentResult<RedisClient> {
        let client = Client::open(self.connection_info()?).map_err(ComponentError::from_source)?;
        Ok(RedisClient { client })
    }
}

#[async_trait]
impl Component for RedisClient {
    async fn close(self) -> ComponentResult<()> {
        drop(self.client);
        Ok(())
    }
}
