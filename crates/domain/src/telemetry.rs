//! Logger family: named `tracing` subscribers built from configuration.

use std::{
    fmt,
    fs::{self, File, OpenOptions},
    path::Path,
    sync::Arc,
};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{level_filters::LevelFilter, Dispatch};
use tracing_subscriber::fmt::{writer::BoxMakeWriter, MakeWriter};

use crate::component::{Component, ComponentError, ComponentResult, Initializer};

/// Settings for one named logger. Every field is optional: a bare entry logs
/// JSON lines at `info` to stdout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Human-readable output when set, JSON lines otherwise.
    #[serde(alias = "Debug")]
    pub debug: bool,
    /// Maximum level (`trace` .. `error`). Empty means `info`.
    #[serde(alias = "Level")]
    pub level: String,
    /// Log file, opened in append mode. Empty writes to stdout.
    #[serde(alias = "Path")]
    pub path: String,
}

impl LoggerConfig {
    fn level_filter(&self) -> ComponentResult<LevelFilter> {
        let level = self.level.trim();
        if level.is_empty() {
            return Ok(LevelFilter::INFO);
        }
        level
            .parse()
            .map_err(|_| ComponentError::invalid(format!("unknown log level `{level}`")))
    }
}

#[derive(Clone)]
struct SharedFile(Arc<File>);

impl<'a> MakeWriter<'a> for SharedFile {
    type Writer = &'a File;

    fn make_writer(&'a self) -> Self::Writer {
        &self.0
    }
}

fn open_log_file(path: &Path) -> ComponentResult<Arc<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Arc::new(file))
}

/// A logger that is not installed globally. Events reach it inside
/// [`LoggerClient::in_scope`] or after [`LoggerClient::install_global`].
#[derive(Clone)]
pub struct LoggerClient {
    dispatch: Dispatch,
    file: Option<Arc<File>>,
}

impl fmt::Debug for LoggerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerClient")
            .field("file", &self.file.is_some())
            .finish_non_exhaustive()
    }
}

impl LoggerClient {
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Runs `f` with this logger as the thread's default subscriber.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Makes this logger the process-wide default. Fails if another global
    /// subscriber is already installed.
    pub fn install_global(&self) -> ComponentResult<()> {
        tracing::dispatcher::set_global_default(self.dispatch.clone())
            .map_err(ComponentError::from_source)
    }
}

#[async_trait]
impl Initializer for LoggerConfig {
    type Handle = LoggerClient;

    async fn init(&self) -> ComponentResult<LoggerClient> {
        let level = self.level_filter()?;
        let path = self.path.trim();
        let (writer, file) = if path.is_empty() {
            (BoxMakeWriter::new(std::io::stdout), None)
        } else {
            let file = open_log_file(Path::new(path))?;
            (
                BoxMakeWriter::new(SharedFile(Arc::clone(&file))),
                Some(file),
            )
        };

        let builder = tracing_subscriber::fmt()
            .with_writer(writer)
            .with_max_level(level)
            .with_target(true)
            .with_ansi(false);
        let dispatch = if self.debug {
            Dispatch::new(builder.finish())
        } else {
            Dispatch::new(builder.json().finish())
        };

        Ok(LoggerClient { dispatch, file })
    }
}

#[async_trait]
impl Component for LoggerClient {
    async fn close(self) -> ComponentResult<()> {
        if let Some(file) = &self.file {
            file.sync_all()?;
        }
        Ok(())
    }
}
