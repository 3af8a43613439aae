//! Environment-driven lookup of the configuration document location.

use std::{env, path::PathBuf};

use thiserror::Error;

/// Variable holding the path of the configuration document.
pub const CONFIG_PATH_VAR: &str = "KINDLING_CONFIG";

/// Setting this variable (to anything) disables `.env` hydration.
pub const SKIP_DOTENV_VAR: &str = "KINDLING_SKIP_DOTENV";

/// Resolves the configuration document path from `KINDLING_CONFIG`, after
/// hydrating `.env` if one is present.
pub fn config_path_from_env() -> Result<PathBuf, ConfigError> {
    hydrate_env_file()?;
    get_required_var(CONFIG_PATH_VAR).map(PathBuf::from)
}

fn get_required_var(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Err(ConfigError::MissingVar { key })
            } else {
                Ok(trimmed.to_string())
            }
        }
        Err(_) => Err(ConfigError::MissingVar { key }),
    }
}

pub fn hydrate_env_file() -> Result<(), ConfigError> {
    if env::var_os(SKIP_DOTENV_VAR).is_some() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ConfigError::Dotenv { source: err }),
    }

    Ok(())
}

/// Errors emitted when `.env` hydration or environment lookup fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable `{key}`")]
    MissingVar { key: &'static str },
    #[error("failed to load .env file: {source}")]
    Dotenv {
        #[from]
        source: dotenvy::Error,
    },
}
