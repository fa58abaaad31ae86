use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchConfig {
    /// Poll period for objects without `spec.pollingInterval`
    #[serde(default = "default_polling_interval_secs")]
    pub default_polling_interval_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            default_polling_interval_secs: default_polling_interval_secs(),
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_polling_interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "watch.default_polling_interval_secs must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn default_polling_interval(&self) -> Duration {
        Duration::from_secs(self.default_polling_interval_secs)
    }
}

fn default_polling_interval_secs() -> u64 {
    30
}
