//! Configuration decoding by trial parse.
//!
//! Documents carry no format tag. [`decode`] tries each entry of
//! [`Format::FALLBACK_ORDER`] and keeps the first one that deserializes into
//! the target type. Input that happens to be valid under an earlier format wins
//! even if it was written for a later one: JSON is a subset of YAML, so JSON
//! documents are normally accepted by the YAML attempt, and an empty document
//! is a valid (empty) TOML table. Callers that know the format can skip the
//! chain with [`decode_as`].

use std::fmt;

use serde::de::DeserializeOwned;
use strum_macros::Display;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Format {
    Toml,
    Yaml,
    Json,
}

impl Format {
    pub const FALLBACK_ORDER: [Format; 3] = [Format::Toml, Format::Yaml, Format::Json];
}

/// Failure of a single format attempt.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("toml: input is not valid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl FormatError {
    pub fn format(&self) -> Format {
        match self {
            Self::Utf8(_) | Self::Toml(_) => Format::Toml,
            Self::Yaml(_) => Format::Yaml,
            Self::Json(_) => Format::Json,
        }
    }
}

/// Every format attempt failed. Attempts are kept oldest first.
#[derive(Debug)]
pub struct DecodeError {
    attempts: Vec<FormatError>,
}

impl DecodeError {
    pub fn attempts(&self) -> &[FormatError] {
        &self.attempts
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unable to decode configuration")?;
        for attempt in &self.attempts {
            write!(f, "; {attempt}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.attempts
            .last()
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

/// Decodes `bytes` with a single, explicitly chosen format.
pub fn decode_as<T: DeserializeOwned>(format: Format, bytes: &[u8]) -> Result<T, FormatError> {
    match format {
        Format::Toml => {
            let text = std::str::from_utf8(bytes)?;
            Ok(toml::from_str(text)?)
        }
        Format::Yaml => Ok(serde_yaml::from_slice(bytes)?),
        Format::Json => Ok(serde_json::from_slice(bytes)?),
    }
}

/// Like [`decode`], also reporting which format was accepted.
pub fn decode_tagged<T: DeserializeOwned>(bytes: &[u8]) -> Result<(T, Format), DecodeError> {
    let mut attempts = Vec::with_capacity(Format::FALLBACK_ORDER.len());
    for format in Format::FALLBACK_ORDER {
        match decode_as(format, bytes) {
            Ok(value) => return Ok((value, format)),
            Err(err) => {
                trace!(%format, error = %err, "configuration format rejected");
                attempts.push(err);
            }
        }
    }
    Err(DecodeError { attempts })
}

/// Decodes `bytes` by trying TOML, then YAML, then JSON.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    decode_tagged(bytes).map(|(value, _)| value)
}
