use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SourceConfig {
    /// Restrict notifications to one namespace; unset watches all namespaces
    #[serde(default)]
    pub namespace: Option<String>,
}

impl SourceConfig {
    /// # Errors
    /// Returns `Error::InvalidConfig` for an empty namespace restriction.
    pub fn validate(&self) -> Result<()> {
        if let Some(ns) = &self.namespace {
            if ns.trim().is_empty() {
                return Err(Error::InvalidConfig(
                    "source.namespace cannot be empty; leave it unset to watch all namespaces".into(),
                ));
            }
        }

        Ok(())
    }
}
