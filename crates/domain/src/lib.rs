//! Building blocks shared by every kindling crate: the component traits, the
//! format-agnostic configuration decoder, the handle registry and the logger
//! family.

pub mod component;
pub mod config;
pub mod decoder;
pub mod registry;
pub mod telemetry;

pub use component::{
    BoxError, Component, ComponentError, ComponentResult, Family, Initializer,
};
pub use config::{config_path_from_env, ConfigError};
pub use decoder::{decode, decode_as, decode_tagged, DecodeError, Format, FormatError};
pub use registry::{CloseAllError, CloseFailure, Registry};
pub use telemetry::{LoggerClient, LoggerConfig};
