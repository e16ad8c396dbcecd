use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use wsrelay_core::error::Result;

/// Relay-assigned connection identifier (random UUID v4, textual).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(Arc<str>);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Arc::from(uuid::Uuid::new_v4().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outbound half of one client's transport.
///
/// `Connection` calls `send_frame` with at most one frame in flight and feeds
/// the result back into its write state machine.
#[async_trait]
pub trait FrameSink: Send + Sync + 'static {
    async fn send_frame(&self, frame: Bytes) -> Result<()>;
}

/// Per-connection writer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    /// Nothing in flight; the next enqueue starts a write.
    Idle,
    /// The queue head is being written; enqueue only appends.
    Writing,
}
