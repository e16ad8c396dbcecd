//! Shared doubles for registry/connection tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::timeout;

use wsrelay_core::error::{RelayError, Result};
use wsrelay_core::Envelope;
use wsrelay_gateway::realtime::{Connection, FrameSink, Registry};

/// Sink that hands every written frame to a channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Bytes>,
    fail: AtomicBool,
    yield_before_write: bool,
}

impl ChannelSink {
    pub fn fail_writes(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send_frame(&self, frame: Bytes) -> Result<()> {
        if self.yield_before_write {
            tokio::task::yield_now().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(RelayError::TransportFailure("peer reset".into()));
        }
        self.tx
            .send(frame)
            .map_err(|_| RelayError::TransportFailure("receiver dropped".into()))
    }
}

pub struct Client {
    pub conn: Arc<Connection>,
    pub sink: Arc<ChannelSink>,
    pub rx: mpsc::UnboundedReceiver<Bytes>,
}

impl Client {
    pub fn id(&self) -> String {
        self.conn.id().to_string()
    }

    /// Next delivered envelope, failing the test after one second.
    pub async fn next(&mut self) -> Envelope {
        let frame = timeout(Duration::from_secs(1), self.rx.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("sink channel closed");
        Envelope::decode(&frame).expect("relay sent an undecodable frame")
    }

    /// Assert nothing more arrives within a short window.
    pub async fn assert_silent(&mut self) {
        if let Ok(Some(frame)) = timeout(Duration::from_millis(100), self.rx.recv()).await {
            panic!("unexpected frame: {}", String::from_utf8_lossy(&frame));
        }
    }
}

/// Build a connection without joining it.
pub fn client(registry: &Arc<Registry>) -> Client {
    client_with(registry, false)
}

pub fn client_with(registry: &Arc<Registry>, yield_before_write: bool) -> Client {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = Arc::new(ChannelSink {
        tx,
        fail: AtomicBool::new(false),
        yield_before_write,
    });
    let conn = Connection::new(sink.clone(), Arc::clone(registry)).unwrap();
    Client { conn, sink, rx }
}

/// Build a connection and join it.
pub fn join(registry: &Arc<Registry>) -> Client {
    let c = client(registry);
    registry.join(&c.conn);
    c
}

pub fn registry() -> Arc<Registry> {
    Arc::new(Registry::default())
}
