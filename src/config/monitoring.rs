use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::SocketAddr;

use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::Error;
use crate::Result;

/// Prometheus `/metrics` listener
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub prometheus_enabled: bool,

    #[serde(default = "default_listen_address")]
    pub listen_address: IpAddr,

    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            prometheus_enabled: false,
            listen_address: default_listen_address(),
            prometheus_port: default_prometheus_port(),
        }
    }
}

impl MonitoringConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_address, self.prometheus_port)
    }

    /// # Errors
    /// Returns `Error::InvalidConfig` when the endpoint is enabled on port 0
    /// or on a privileged port.
    pub fn validate(&self) -> Result<()> {
        if !self.prometheus_enabled {
            if self.prometheus_port != default_prometheus_port() {
                warn!(
                    "monitoring.prometheus_port is {} but the metrics endpoint is disabled",
                    self.prometheus_port
                );
            }
            return Ok(());
        }

        match self.prometheus_port {
            0 => Err(Error::InvalidConfig(
                "monitoring.prometheus_port cannot be 0 when enabled".into(),
            )),
            port if port < 1024 => Err(Error::InvalidConfig(format!(
                "monitoring.prometheus_port {} is a privileged port",
                port
            ))),
            _ => Ok(()),
        }
    }
}

fn default_listen_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_prometheus_port() -> u16 {
    9090
}
