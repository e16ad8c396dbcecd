//! wsrelay gateway
//!
//! - WebSocket endpoint: / (alias /v1/ws)
//! - Every inbound chat is fanned out to every connected client
//! - Tracing span per session
//! - Heartbeat ping + idle timeout

use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

use wsrelay_core::error::{RelayError, Result};
use wsrelay_gateway::{app_state::AppState, config, server};

fn main() -> ExitCode {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = config::Cli::parse();
    match start(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, code = e.code().as_str(), "wsrelay-gateway exiting");
            ExitCode::FAILURE
        }
    }
}

fn start(cli: &config::Cli) -> Result<()> {
    let cfg = config::resolve(cli)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(cfg.gateway.workers)
        .enable_all()
        .build()
        .map_err(|e| RelayError::StartupFailure(format!("runtime build failed: {e}")))?;

    runtime.block_on(async move {
        let listen = cfg.gateway.listen_addr()?;
        let workers = cfg.gateway.workers;
        let listener = TcpListener::bind(listen)
            .await
            .map_err(|e| RelayError::StartupFailure(format!("bind {listen} failed: {e}")))?;

        tracing::info!(%listen, workers, "wsrelay-gateway listening");
        server::run(listener, AppState::new(cfg), server::shutdown_signal()).await
    })
}
