//! Capability shape shared by every component family.

use async_trait::async_trait;
use strum_macros::{AsRefStr, Display, EnumIter};
use thiserror::Error;

/// Boxed error produced by an external client library.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Common result alias for component initialization and shutdown.
pub type ComponentResult<T> = Result<T, ComponentError>;

/// Category of infrastructure component. Declaration order is boot order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum Family {
    Logger,
    Cache,
    Relational,
    TimeSeries,
}

#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("client error: {0}")]
    Client(#[source] BoxError),
}

impl ComponentError {
    pub fn from_source(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Client(Box::new(err))
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// A live handle owned by the registry until it is closed.
#[async_trait]
pub trait Component: Send + Sync {
    /// Releases the underlying client. Consumes the handle.
    async fn close(self) -> ComponentResult<()>;
}

/// A decoded configuration record that knows how to build its handle.
#[async_trait]
pub trait Initializer: Send + Sync {
    type Handle: Component;

    async fn init(&self) -> ComponentResult<Self::Handle>;
}
