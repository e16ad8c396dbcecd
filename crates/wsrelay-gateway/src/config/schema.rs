use std::net::SocketAddr;

use serde::Deserialize;
use wsrelay_core::error::{RelayError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            version: 1,
            gateway: GatewaySection::default(),
        }
    }
}

impl RelayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RelayError::StartupFailure(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.gateway.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Runtime worker threads.
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            workers: default_workers(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if !(1..=1024).contains(&self.workers) {
            return Err(RelayError::StartupFailure(
                "gateway.workers must be between 1 and 1024".into(),
            ));
        }
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(RelayError::StartupFailure(
                "gateway.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(RelayError::StartupFailure(
                "gateway.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(RelayError::StartupFailure(
                "gateway.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if !(1000..=60000).contains(&self.write_timeout_ms) {
            return Err(RelayError::StartupFailure(
                "gateway.write_timeout_ms must be between 1000 and 60000".into(),
            ));
        }
        if !(64..=1_048_576).contains(&self.max_frame_bytes) {
            return Err(RelayError::StartupFailure(
                "gateway.max_frame_bytes must be between 64 and 1048576".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            RelayError::StartupFailure(format!("invalid listen address {:?}: {e}", self.listen))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_workers() -> usize {
    1
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_write_timeout_ms() -> u64 {
    10000
}
fn default_max_frame_bytes() -> usize {
    4096
}
