//! Serve loop with graceful shutdown.

use std::future::Future;

use tokio::net::TcpListener;

use wsrelay_core::error::{RelayError, Result};
use wsrelay_core::{Envelope, Kind};

use crate::{app_state::AppState, router};

/// Serve on an already-bound listener until `shutdown` resolves.
///
/// On shutdown the relay reports draining on `/readyz` and tells every
/// connected client it is going away.
pub async fn run<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router::build_router(state.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("relay draining");
            state.set_draining();
            state
                .registry()
                .broadcast(&Envelope::system(Kind::Error, "relay shutting down"));
        })
        .await
        .map_err(|e| RelayError::TransportFailure(format!("server failed: {e}")))
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
