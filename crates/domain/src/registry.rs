use std::{collections::HashMap, fmt};

use tracing::{debug, warn};

use crate::component::{Component, ComponentError, Family};

/// Live handles keyed by family and instance key.
#[derive(Debug)]
pub struct Registry<H> {
    families: HashMap<Family, HashMap<String, H>>,
}

impl<H> Default for Registry<H> {
    fn default() -> Self {
        Self {
            families: HashMap::new(),
        }
    }
}

impl<H: Component> Registry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `handle` under (`family`, `key`). An existing entry is replaced
    /// without being closed and handed back to the caller.
    pub fn set(&mut self, family: Family, key: impl Into<String>, handle: H) -> Option<H> {
        self.families
            .entry(family)
            .or_default()
            .insert(key.into(), handle)
    }

    pub fn get(&self, family: Family, key: &str) -> Option<&H> {
        self.families.get(&family)?.get(key)
    }

    pub fn contains(&self, family: Family, key: &str) -> bool {
        self.get(family, key).is_some()
    }

    pub fn keys(&self, family: Family) -> impl Iterator<Item = &str> + '_ {
        self.families
            .get(&family)
            .into_iter()
            .flat_map(|entries| entries.keys().map(String::as_str))
    }

    pub fn family_len(&self, family: Family) -> usize {
        self.families.get(&family).map_or(0, HashMap::len)
    }

    pub fn len(&self) -> usize {
        self.families.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closes every registered handle. A failing close does not stop the
    /// remaining ones; all failures are reported together.
    pub async fn close_all(&mut self) -> Result<(), CloseAllError> {
        let mut families: Vec<_> = self.families.drain().collect();
        families.sort_by_key(|(family, _)| *family);

        let mut failures = Vec::new();
        for (family, entries) in families {
            for (key, handle) in entries {
                match handle.close().await {
                    Ok(()) => debug!(%family, key = %key, "component closed"),
                    Err(source) => {
                        warn!(%family, key = %key, error = %source, "component close failed");
                        failures.push(CloseFailure {
                            family,
                            key,
                            source,
                        });
                    }
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CloseAllError { failures })
        }
    }
}

#[derive(Debug)]
pub struct CloseFailure {
    pub family: Family,
    pub key: String,
    pub source: ComponentError,
}

/// One or more handles failed to close.
#[derive(Debug)]
pub struct CloseAllError {
    failures: Vec<CloseFailure>,
}

impl CloseAllError {
    pub fn failures(&self) -> &[CloseFailure] {
        &self.failures
    }
}

impl fmt::Display for CloseAllError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to close {} component(s)", self.failures.len())?;
        for failure in &self.failures {
            write!(
                f,
                "; {} `{}`: {}",
                failure.family, failure.key, failure.source
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for CloseAllError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|failure| &failure.source as &(dyn std::error::Error + 'static))
    }
}
