//! Configuration management for the controller.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Section-wise validation
mod log;
mod monitoring;
mod source;
mod watch;

pub use log::*;
pub use monitoring::*;
pub use source::*;
pub use watch::*;


use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Environment variable prefix, e.g. `KORE__WATCH__DEFAULT_POLLING_INTERVAL_SECS`
pub const ENV_PREFIX: &str = "KORE";

/// Main configuration container for the controller process
///
/// Sources are merged with increasing priority:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ControllerConfig {
    /// Event source boundary settings
    #[serde(default)]
    pub source: SourceConfig,
    /// Default watch task behavior
    #[serde(default)]
    pub watch: WatchConfig,
    /// Metrics endpoint
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    /// Log output
    #[serde(default)]
    pub log: LogConfig,
}

impl ControllerConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Callers MUST call [`validate`](Self::validate) before using the
    /// result, so that further overrides can still be layered on top.
    ///
    /// # Example
    /// ```ignore
    /// std::env::set_var("CONFIG_PATH", "config/controller.toml");
    /// let cfg = ControllerConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional overrides from `path` without validation.
    ///
    /// Environment variables are re-applied on top so they keep the highest
    /// priority.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every section and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.source.validate()?;
        self.watch.validate()?;
        self.monitoring.validate()?;
        self.log.validate()?;
        Ok(self)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
