//! One-shot bootstrapping of named infrastructure clients.
//!
//! A [`Kindling`] decodes a TOML, YAML or JSON document, initializes every
//! logger, Redis client, relational pool and TDengine client it declares, and
//! keeps the handles for lookup by key:
//!
//! ```no_run
//! # async fn run() -> Result<(), kindling::BootError> {
//! let mut kindling = kindling::Kindling::new();
//! kindling.boot(std::path::Path::new("kindling.toml")).await?;
//! if let Some(db) = kindling.database("primary") {
//!     db.ping().await.ok();
//! }
//! kindling.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod boot;
pub mod config;
mod handle;

#[cfg(test)]
mod tests;

pub use boot::{BootError, BootSource, Kindling};
pub use config::{KindlingConfig, Namespace};
pub use handle::Handle;

pub use kindling_cache::{RedisClient, RedisConfig};
pub use kindling_domain::{
    CloseAllError, CloseFailure, Component, ComponentError, DecodeError, Family, Format,
    FormatError, Initializer, LoggerClient, LoggerConfig, Registry,
};
pub use kindling_storage::{
    DatabaseClient, DatabaseConfig, QueryResult, TDengineClient, TDengineConfig, TimeSeriesError,
};
