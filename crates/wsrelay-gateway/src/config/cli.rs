use std::path::PathBuf;

use clap::Parser;

/// Real-time WebSocket broadcast relay.
#[derive(Debug, Parser)]
#[command(name = "wsrelay-gateway", version)]
pub struct Cli {
    /// Listen address, e.g. 127.0.0.1:8080
    pub addr: Option<String>,

    /// Runtime worker threads (values below 1 are raised to 1)
    pub workers: Option<usize>,

    /// Optional YAML config; positional arguments override it
    #[arg(long)]
    pub config: Option<PathBuf>,
}
