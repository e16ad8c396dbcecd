//! Relay config: strict YAML file plus command-line overrides.

pub mod cli;
pub mod schema;

use std::fs;
use std::path::Path;

use wsrelay_core::error::{RelayError, Result};

pub use cli::Cli;
pub use schema::{GatewaySection, RelayConfig};

pub fn load_from_file(path: &Path) -> Result<RelayConfig> {
    let s = fs::read_to_string(path).map_err(|e| {
        RelayError::StartupFailure(format!("read config {} failed: {e}", path.display()))
    })?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<RelayConfig> {
    let cfg: RelayConfig = serde_yaml::from_str(s)
        .map_err(|e| RelayError::StartupFailure(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Build the effective config: file (if any), then positional overrides.
pub fn resolve(cli: &Cli) -> Result<RelayConfig> {
    let mut cfg = match &cli.config {
        Some(path) => load_from_file(path)?,
        None => {
            if cli.addr.is_none() {
                return Err(RelayError::StartupFailure(
                    "must provide a listen address or --config".into(),
                ));
            }
            RelayConfig::default()
        }
    };

    if let Some(addr) = &cli.addr {
        cfg.gateway.listen = addr.clone();
    }
    if let Some(workers) = cli.workers {
        cfg.gateway.workers = workers.max(1);
    }

    cfg.validate()?;
    Ok(cfg)
}
