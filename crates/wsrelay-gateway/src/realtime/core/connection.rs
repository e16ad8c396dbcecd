//! One client's server-side representative.
//!
//! The outbound queue is driven by a two-state machine:
//! - `enqueue`: `Idle -> Writing` (start writing the head) or
//!   `Writing -> Writing` (append only).
//! - write completion: `Writing -> Writing` (start the new head) or
//!   `Writing -> Idle` (queue drained).
//!
//! So at most one write is in flight per client and frames leave in enqueue
//! order, while any number of broadcasters can enqueue concurrently.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::sync::Notify;

use wsrelay_core::error::{RelayError, Result};
use wsrelay_core::{Envelope, Kind};

use crate::realtime::core::Registry;
use crate::realtime::types::{ConnectionId, FrameSink, WriteState};

struct Outbound {
    state: WriteState,
    /// Head is the frame currently being written while `state == Writing`.
    queue: VecDeque<Bytes>,
}

pub struct Connection {
    id: ConnectionId,
    sink: Arc<dyn FrameSink>,
    registry: Arc<Registry>,
    runtime: Handle,
    outbound: Mutex<Outbound>,
    closed: AtomicBool,
    shutdown: Notify,
}

impl Connection {
    /// Build a connection with a fresh id. Must be called inside a tokio runtime.
    pub fn new(sink: Arc<dyn FrameSink>, registry: Arc<Registry>) -> Result<Arc<Self>> {
        let runtime = Handle::try_current()
            .map_err(|e| RelayError::TransportFailure(format!("no runtime for writes: {e}")))?;
        Ok(Arc::new(Self {
            id: ConnectionId::generate(),
            sink,
            registry,
            runtime,
            outbound: Mutex::new(Outbound {
                state: WriteState::Idle,
                queue: VecDeque::new(),
            }),
            closed: AtomicBool::new(false),
            shutdown: Notify::new(),
        }))
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// True once teardown has begun.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn write_state(&self) -> WriteState {
        self.lock_outbound().state
    }

    /// Frames not yet confirmed written, including the one in flight.
    pub fn pending(&self) -> usize {
        self.lock_outbound().queue.len()
    }

    /// Encode and enqueue. Returns false if the connection is tearing down.
    pub fn enqueue(self: &Arc<Self>, env: &Envelope) -> bool {
        self.enqueue_frame(env.encode())
    }

    /// Append an already-encoded frame to the tail of the queue.
    pub fn enqueue_frame(self: &Arc<Self>, frame: Bytes) -> bool {
        let head = {
            let mut out = self.lock_outbound();
            // checked under the lock: `close` clears the queue under the same lock
            if self.is_closed() {
                return false;
            }
            out.queue.push_back(frame);
            match out.state {
                WriteState::Writing => None,
                WriteState::Idle => {
                    out.state = WriteState::Writing;
                    out.queue.front().cloned()
                }
            }
        };

        self.registry.metrics().frames_enqueued.inc(&[]);
        if let Some(head) = head {
            self.begin_write(head);
        }
        true
    }

    /// Completion of the in-flight write.
    pub fn on_write_complete(self: &Arc<Self>, result: Result<()>) {
        if let Err(e) = result {
            if !self.is_closed() {
                tracing::warn!(conn_id = %self.id, error = %e, "write failed; closing connection");
                self.registry
                    .metrics()
                    .write_failures
                    .inc(&[("code", e.code().as_str())]);
            }
            self.close();
            return;
        }

        let next = {
            let mut out = self.lock_outbound();
            if self.is_closed() {
                out.queue.clear();
                out.state = WriteState::Idle;
                return;
            }
            out.queue.pop_front();
            match out.queue.front() {
                Some(frame) => Some(frame.clone()),
                None => {
                    out.state = WriteState::Idle;
                    None
                }
            }
        };

        if let Some(frame) = next {
            self.begin_write(frame);
        }
    }

    /// Handle one inbound payload from this client.
    ///
    /// A valid envelope is re-stamped as a chat from this connection and
    /// broadcast; anything else is answered privately and the session goes on.
    pub fn on_inbound_frame(self: &Arc<Self>, payload: &[u8]) {
        match Envelope::decode(payload) {
            Ok(env) => {
                // clients may not pick their sender, kind or timestamp
                let chat = Envelope::chat(self.id.as_str(), env.contents());
                self.registry.broadcast(&chat);
            }
            Err(e) => self.reply_error(&e),
        }
    }

    /// Send a system `error` envelope to this client only.
    pub fn reply_error(self: &Arc<Self>, err: &RelayError) {
        tracing::debug!(conn_id = %self.id, error = %err, "rejected inbound frame");
        self.registry
            .metrics()
            .decode_errors
            .inc(&[("code", err.code().as_str())]);
        self.enqueue(&Envelope::system(Kind::Error, err.to_string()));
    }

    /// Begin teardown. Idempotent: only the first call discards the queue,
    /// wakes the session and leaves the registry.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        {
            let mut out = self.lock_outbound();
            out.queue.clear();
            out.state = WriteState::Idle;
        }

        self.shutdown.notify_one();
        self.registry.leave(self);
    }

    /// Resolves once `close` has run (e.g. after a write failure).
    pub async fn closed(&self) {
        if self.is_closed() {
            return;
        }
        self.shutdown.notified().await;
    }

    fn begin_write(self: &Arc<Self>, frame: Bytes) {
        let conn = Arc::clone(self);
        self.runtime.spawn(async move {
            let result = conn.sink.send_frame(frame).await;
            conn.on_write_complete(result);
        });
    }

    fn lock_outbound(&self) -> MutexGuard<'_, Outbound> {
        self.outbound.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
