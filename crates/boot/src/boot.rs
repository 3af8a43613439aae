use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
};

use kindling_cache::RedisClient;
use kindling_domain::{
    config_path_from_env, decode, decode_as, CloseAllError, ComponentError, ConfigError,
    DecodeError, Family, Format, FormatError, Initializer, LoggerClient, Registry,
};
use kindling_storage::{DatabaseClient, TDengineClient};
use metrics::counter;
use strum::IntoEnumIterator;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{config::KindlingConfig, handle::Handle};

/// Where the configuration document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl BootSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Uses the file named by `KINDLING_CONFIG` (after `.env` hydration).
    pub fn from_env() -> Result<Self, ConfigError> {
        config_path_from_env().map(Self::Path)
    }

    fn read(self) -> Result<Vec<u8>, BootError> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::Path(path) => match std::fs::read(&path) {
                Ok(bytes) => Ok(bytes),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    Err(BootError::MissingFile { path })
                }
                Err(source) => Err(BootError::Read { path, source }),
            },
        }
    }
}

impl From<PathBuf> for BootSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for BootSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for BootSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for BootSource {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

#[derive(Debug, Error)]
pub enum BootError {
    #[error("config file `{}` does not exist", path.display())]
    MissingFile { path: PathBuf },
    #[error("failed to read config file `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("unable to decode configuration: {0}")]
    Format(#[from] FormatError),
    #[error("init {family} error: component `{key}`: {source}")]
    Init {
        family: Family,
        key: String,
        #[source]
        source: ComponentError,
    },
    #[error("shutdown error: {0}")]
    Shutdown(#[from] CloseAllError),
}

/// Owns the decoded configuration, the live components and the boot flag.
///
/// `boot` and `shutdown` take `&mut self`; callers sharing one instance across
/// tasks put it behind their own lock.
#[derive(Debug, Default)]
pub struct Kindling {
    config: KindlingConfig,
    components: Registry<Handle>,
    booted: bool,
    format: Option<Format>,
}

impl Kindling {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes documents with `format` only instead of trying each format.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Decodes the document and initializes every declared component, family
    /// by family in [`Family`] order.
    ///
    /// The first failing component aborts the boot. Components registered
    /// before the failure stay registered. Booting an already booted instance
    /// does not close the handles of the previous boot; entries with the same
    /// key are replaced.
    pub async fn boot(&mut self, source: impl Into<BootSource>) -> Result<(), BootError> {
        if self.booted {
            warn!("kindling already booted; re-running boot without closing components");
            self.booted = false;
        }

        let bytes = source.into().read()?;
        let config: KindlingConfig = match self.format {
            Some(format) => decode_as(format, &bytes)?,
            None => decode(&bytes)?,
        };
        self.config = config;

        let namespace = &self.config.kindling;
        if namespace.debug {
            debug!(config = ?namespace, "decoded kindling configuration");
        }

        for family in Family::iter() {
            let registry = &mut self.components;
            match family {
                Family::Logger => run_stage(registry, family, &namespace.logger).await?,
                Family::Cache => run_stage(registry, family, &namespace.redis).await?,
                Family::Relational => run_stage(registry, family, &namespace.database).await?,
                Family::TimeSeries => run_stage(registry, family, &namespace.tdengine).await?,
            }
        }

        self.booted = true;
        info!(components = self.components.len(), "kindling booted");
        Ok(())
    }

    /// Closes every registered component. A no-op before the first successful
    /// boot. The boot flag is left set.
    pub async fn shutdown(&mut self) -> Result<(), BootError> {
        if !self.booted {
            return Ok(());
        }
        let total = self.components.len();
        self.components.close_all().await.map_err(|err| {
            for failure in err.failures() {
                counter!(
                    "kindling_component_close_failures_total",
                    "family" => failure.family.to_string()
                )
                .increment(1);
            }
            err
        })?;
        info!(closed = total, "kindling shut down");
        Ok(())
    }

    pub fn is_booted(&self) -> bool {
        self.booted
    }

    pub fn is_debug(&self) -> bool {
        self.config.kindling.debug
    }

    pub fn config(&self) -> &KindlingConfig {
        &self.config
    }

    pub fn components(&self) -> &Registry<Handle> {
        &self.components
    }

    pub fn logger(&self, key: &str) -> Option<&LoggerClient> {
        self.components.get(Family::Logger, key)?.as_logger()
    }

    pub fn redis(&self, key: &str) -> Option<&RedisClient> {
        self.components.get(Family::Cache, key)?.as_redis()
    }

    pub fn database(&self, key: &str) -> Option<&DatabaseClient> {
        self.components.get(Family::Relational, key)?.as_database()
    }

    pub fn tdengine(&self, key: &str) -> Option<&TDengineClient> {
        self.components.get(Family::TimeSeries, key)?.as_tdengine()
    }
}

async fn run_stage<C>(
    registry: &mut Registry<Handle>,
    family: Family,
    entries: &HashMap<String, C>,
) -> Result<(), BootError>
where
    C: Initializer,
    Handle: From<C::Handle>,
{
    if entries.is_empty() {
        return Ok(());
    }
    debug!(%family, count = entries.len(), "initializing components");

    for (key, record) in entries {
        let handle = match record.init().await {
            Ok(handle) => handle,
            Err(source) => {
                counter!(
                    "kindling_component_init_failures_total",
                    "family" => family.to_string()
                )
                .increment(1);
                warn!(%family, key = %key, error = %source, "component init failed");
                return Err(BootError::Init {
                    family,
                    key: key.clone(),
                    source,
                });
            }
        };
        registry.set(family, key.clone(), Handle::from(handle));
        counter!(
            "kindling_components_initialized_total",
            "family" => family.to_string()
        )
        .increment(1);
        info!(%family, key = %key, "component initialized");
    }
    Ok(())
}
