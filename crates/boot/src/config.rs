//! Typed configuration tree decoded from the boot document.

use std::collections::HashMap;

use kindling_cache::RedisConfig;
use kindling_domain::LoggerConfig;
use kindling_storage::{DatabaseConfig, TDengineConfig};
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct KindlingConfig {
    #[serde(alias = "Kindling")]
    pub kindling: Namespace,
}

/// Every family section maps an instance key to that family's record.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Namespace {
    #[serde(alias = "Debug")]
    pub debug: bool,
    #[serde(alias = "Logger")]
    pub logger: HashMap<String, LoggerConfig>,
    #[serde(alias = "Redis")]
    pub redis: HashMap<String, RedisConfig>,
    #[serde(alias = "Database", alias = "gorm", alias = "Gorm")]
    pub database: HashMap<String, DatabaseConfig>,
    #[serde(alias = "TDengine")]
    pub tdengine: HashMap<String, TDengineConfig>,
}

impl Namespace {
    pub fn is_empty(&self) -> bool {
        self.logger.is_empty()
            && self.redis.is_empty()
            && self.database.is_empty()
            && self.tdengine.is_empty()
    }
}
