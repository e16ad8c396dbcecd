//! WebSocket session.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS
//! - Build the `Connection`, join the registry, and own its teardown
//! - Feed inbound payloads to `Connection::on_inbound_frame` in arrival order
//! - Lifecycle: ping + idle timeout, oversized frame rejection
//!
//! The loop itself (`drive_session`) only sees a stream of classified
//! inbound messages and a ping callback, so it runs the same over a socket
//! or over an in-memory stream.

use std::sync::Arc;

use axum::{
    extract::{ws::WebSocket, ws::WebSocketUpgrade, State},
    response::Response,
};
use futures_util::{Stream, StreamExt};
use tokio::time::{Duration, Instant};
use tracing::Instrument;

use wsrelay_core::error::{RelayError, Result};

use crate::app_state::AppState;
use crate::config::GatewaySection;
use crate::realtime::{Connection, Registry};
use crate::transport::codec::{decode, Inbound};
use crate::transport::sink::{WriteDeadline, WsSink};

/// Per-session timing and size limits.
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub ping_every: Duration,
    pub idle_timeout: Duration,
    pub max_frame_bytes: usize,
}

impl SessionLimits {
    pub fn from_config(gw: &GatewaySection) -> Self {
        Self {
            ping_every: Duration::from_millis(gw.ping_interval_ms),
            idle_timeout: Duration::from_millis(gw.idle_timeout_ms),
            max_frame_bytes: gw.max_frame_bytes,
        }
    }
}

/// Closes the connection and releases the session gauge when the session
/// ends, however it ends.
struct Teardown {
    conn: Arc<Connection>,
    registry: Arc<Registry>,
}

impl Teardown {
    fn begin(conn: Arc<Connection>, registry: Arc<Registry>) -> Self {
        registry.metrics().sessions_active.inc(&[]);
        Self { conn, registry }
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        self.conn.close();
        self.registry.metrics().sessions_active.dec(&[]);
    }
}

// --------------------
// Entry
// --------------------
pub async fn ws_upgrade(State(app): State<AppState>, ws: WebSocketUpgrade) -> Response {
    app.metrics().ws_upgrades.inc(&[]);
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = run_session(app, socket).await {
            tracing::warn!(error = %e, code = e.code().as_str(), "session failed");
        }
    })
}

async fn run_session(app: AppState, socket: WebSocket) -> Result<()> {
    let gw = &app.cfg().gateway;
    let limits = SessionLimits::from_config(gw);
    let write_timeout = Duration::from_millis(gw.write_timeout_ms);

    let (ws_tx, ws_rx) = socket.split();
    let ws_sink = Arc::new(WsSink::new(ws_tx, write_timeout));
    let frames = Arc::new(WriteDeadline::new(ws_sink.clone(), write_timeout));
    let conn = Connection::new(frames, app.registry())?;

    let inbound = ws_rx.map(|msg| {
        msg.map(decode)
            .map_err(|e| RelayError::TransportFailure(e.to_string()))
    });

    let pinger = {
        let ws_sink = Arc::clone(&ws_sink);
        let conn = Arc::clone(&conn);
        move || {
            let ws_sink = Arc::clone(&ws_sink);
            let conn = Arc::clone(&conn);
            // off the read loop: a slow frame write may hold the socket
            tokio::spawn(
                async move {
                    if let Err(e) = ws_sink.ping().await {
                        tracing::debug!(error = %e, "ping failed");
                        conn.close();
                    }
                }
                .in_current_span(),
            );
        }
    };

    let span = tracing::info_span!("session", conn_id = %conn.id());
    async move {
        let reason = drive_session(conn, app.registry(), inbound, limits, pinger).await;
        tracing::info!(reason, "session ending");
        ws_sink.close().await;
        Ok(())
    }
    .instrument(span)
    .await
}

// --------------------
// Core session loop
// --------------------

/// Join `conn`, pump `inbound` into it until the session ends, then tear it
/// down. Returns why the session ended.
pub async fn drive_session<S, P>(
    conn: Arc<Connection>,
    registry: Arc<Registry>,
    inbound: S,
    limits: SessionLimits,
    mut on_ping: P,
) -> &'static str
where
    S: Stream<Item = Result<Inbound>>,
    P: FnMut(),
{
    let mut inbound = std::pin::pin!(inbound);
    let teardown = Teardown::begin(Arc::clone(&conn), Arc::clone(&registry));
    registry.join(&conn);

    let mut ping_tick =
        tokio::time::interval_at(Instant::now() + limits.ping_every, limits.ping_every);
    ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_activity = Instant::now();

    let reason = loop {
        tokio::select! {
            // relay-side teardown (write failure, failed ping)
            _ = conn.closed() => break "closed by relay",

            incoming = inbound.next() => {
                let Some(incoming) = incoming else { break "stream ended"; };
                let msg = match incoming {
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::debug!(error = %e, "read failed");
                        break "read failed";
                    }
                };
                last_activity = Instant::now();

                match msg {
                    Inbound::Frame(payload) => {
                        if payload.len() > limits.max_frame_bytes {
                            conn.reply_error(&RelayError::MalformedPayload(format!(
                                "payload too large ({} > {} bytes)",
                                payload.len(),
                                limits.max_frame_bytes
                            )));
                            continue;
                        }
                        conn.on_inbound_frame(&payload);
                    }
                    Inbound::Ping | Inbound::Pong => {}
                    Inbound::Close => break "client closed",
                }
            }

            _ = ping_tick.tick() => on_ping(),

            _ = tokio::time::sleep_until(last_activity + limits.idle_timeout) => {
                break "idle timeout";
            }
        }
    };

    drop(teardown);
    reason
}
