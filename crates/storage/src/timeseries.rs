//! TDengine time-series family, spoken over the taosAdapter REST interface.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use kindling_domain::{Component, ComponentError, ComponentResult, Initializer};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_PASSWORD: &str = "taosdata";

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TDengineConfig {
    /// Base URL of the REST endpoint, e.g. `http://127.0.0.1:6041`.
    #[serde(alias = "Url", alias = "Addr", alias = "addr")]
    pub url: String,
    #[serde(alias = "User")]
    pub user: String,
    #[serde(alias = "Password")]
    pub password: String,
    /// Default database for statements that do not qualify table names.
    #[serde(alias = "Database", alias = "DB", alias = "db")]
    pub database: Option<String>,
    #[serde(alias = "TimeoutSecs")]
    pub timeout_secs: Option<u64>,
}

impl Default for TDengineConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: DEFAULT_USER.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            database: None,
            timeout_secs: None,
        }
    }
}

impl fmt::Debug for TDengineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TDengineConfig")
            .field("url", &crate::redact_url(&self.url))
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl TDengineConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    fn endpoint(&self) -> ComponentResult<Url> {
        let raw = self.url.trim();
        let mut url = Url::parse(raw).map_err(|err| {
            ComponentError::invalid(format!("invalid tdengine url `{raw}`: {err}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ComponentError::invalid(format!(
                "tdengine url `{raw}` must use http or https"
            )));
        }
        match self.database.as_deref().map(str::trim) {
            Some(db) if !db.is_empty() => url.set_path(&format!("/rest/sql/{db}")),
            _ => url.set_path("/rest/sql"),
        }
        Ok(url)
    }
}

#[derive(Debug, Error)]
pub enum TimeSeriesError {
    #[error("tdengine request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("tdengine returned code {code}: {desc}")]
    Server { code: i64, desc: String },
}

#[derive(Debug, Deserialize)]
struct RestResponse {
    code: i64,
    #[serde(default)]
    desc: Option<String>,
    #[serde(default)]
    column_meta: Vec<Vec<Value>>,
    #[serde(default)]
    data: Vec<Vec<Value>>,
    #[serde(default)]
    rows: u64,
}

/// Decoded result of one SQL statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub data: Vec<Vec<Value>>,
    pub rows: u64,
}

impl RestResponse {
    fn into_result(self) -> Result<QueryResult, TimeSeriesError> {
        if self.code != 0 {
            return Err(TimeSeriesError::Server {
                code: self.code,
                desc: self.desc.unwrap_or_default(),
            });
        }
        let columns = self
            .column_meta
            .into_iter()
            .filter_map(|meta| meta.into_iter().next())
            .map(|name| match name {
                Value::String(name) => name,
                other => other.to_string(),
            })
            .collect();
        Ok(QueryResult {
            columns,
            data: self.data,
            rows: self.rows,
        })
    }
}

#[derive(Clone)]
pub struct TDengineClient {
    http: reqwest::Client,
    endpoint: Url,
    user: String,
    password: String,
}

impl fmt::Debug for TDengineClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TDengineClient")
            .field("endpoint", &crate::redact_url(self.endpoint.as_str()))
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl TDengineClient {
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Executes one SQL statement.
    pub async fn exec(&self, sql: &str) -> Result<QueryResult, TimeSeriesError> {
        debug!(endpoint = %self.endpoint, "tdengine exec");
        let response: RestResponse = self
            .http
            .post(self.endpoint.clone())
            .basic_auth(&self.user, Some(&self.password))
            .body(sql.to_string())
            .send()
            .await?
            .json()
            .await?;
        response.into_result()
    }

    pub async fn server_version(&self) -> Result<Option<String>, TimeSeriesError> {
        let result = self.exec("SELECT SERVER_VERSION()").await?;
        Ok(result
            .data
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .and_then(|value| value.as_str().map(str::to_string)))
    }
}

#[async_trait]
impl Initializer for TDengineConfig {
    type Handle = TDengineClient;

    async fn init(&self) -> ComponentResult<TDengineClient> {
        let endpoint = self.endpoint()?;
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().map_err(ComponentError::from_source)?;
        Ok(TDengineClient {
            http,
            endpoint,
            user: self.user.clone(),
            password: self.password.clone(),
        })
    }
}

#[async_trait]
impl Component for TDengineClient {
    async fn close(self) -> ComponentResult<()> {
        drop(self.http);
        Ok(())
    }
}
