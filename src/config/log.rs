use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for daily rolling log files; logs go to stderr when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            log_dir: None,
        }
    }
}

impl LogConfig {
    pub fn validate(&self) -> Result<()> {
        EnvFilter::try_new(&self.level)
            .map_err(|e| Error::InvalidConfig(format!("log.level {:?} is not a valid filter: {}", self.level, e)))?;

        if let Some(dir) = &self.log_dir {
            if dir.as_os_str().is_empty() {
                return Err(Error::InvalidConfig("log.log_dir path cannot be empty".into()));
            }
        }

        Ok(())
    }
}

fn default_level() -> String {
    "info".to_string()
}
