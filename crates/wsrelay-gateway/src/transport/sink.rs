//! WebSocket-backed `FrameSink` and the write deadline applied to it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};

use wsrelay_core::error::{RelayError, Result};

use crate::realtime::FrameSink;

/// Write half of one socket. Relay frames go out as Text messages.
///
/// Frame writes are unbounded here; wrap the sink in [`WriteDeadline`].
/// Control frames (ping, close) carry their own deadline.
pub struct WsSink {
    inner: Mutex<SplitSink<WebSocket, Message>>,
    control_timeout: Duration,
    ping_pending: AtomicBool,
}

impl WsSink {
    pub fn new(inner: SplitSink<WebSocket, Message>, control_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(inner),
            control_timeout,
            ping_pending: AtomicBool::new(false),
        }
    }

    /// Send a ping. Returns `Ok` immediately when a previous ping is still
    /// waiting for the socket.
    pub async fn ping(&self) -> Result<()> {
        if self.ping_pending.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let res = self.send_within(Message::Ping(Vec::new())).await;
        self.ping_pending.store(false, Ordering::Release);
        res
    }

    /// Best-effort close frame.
    pub async fn close(&self) {
        let _ = self.send_within(Message::Close(None)).await;
    }

    async fn send_within(&self, msg: Message) -> Result<()> {
        match timeout(self.control_timeout, self.send(msg)).await {
            Ok(res) => res,
            Err(_) => Err(RelayError::TransportFailure("control frame timed out".into())),
        }
    }

    async fn send(&self, msg: Message) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner
            .send(msg)
            .await
            .map_err(|e| RelayError::TransportFailure(e.to_string()))
    }
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send_frame(&self, frame: Bytes) -> Result<()> {
        // frames come from `Envelope::encode`, which only produces JSON text
        let text = String::from_utf8(frame.to_vec())
            .map_err(|e| RelayError::TransportFailure(format!("frame is not utf-8: {e}")))?;
        self.send(Message::Text(text)).await
    }
}

/// Bounds every frame write of the wrapped sink.
///
/// A write still pending after `limit` fails with `TransportFailure`, which
/// tears the owning connection down.
pub struct WriteDeadline {
    inner: Arc<dyn FrameSink>,
    limit: Duration,
}

impl WriteDeadline {
    pub fn new(inner: Arc<dyn FrameSink>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl FrameSink for WriteDeadline {
    async fn send_frame(&self, frame: Bytes) -> Result<()> {
        match timeout(self.limit, self.inner.send_frame(frame)).await {
            Ok(res) => res,
            Err(_) => Err(RelayError::TransportFailure(format!(
                "write timed out after {} ms",
                self.limit.as_millis()
            ))),
        }
    }
}
