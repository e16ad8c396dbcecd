//! Process-wide membership set and fan-out.
//!
//! Membership is guarded by one reader/writer lock:
//! - `join` / `leave` hold the write lock across both the mutation and the
//!   resulting announcement, so membership changes and their announcements
//!   are totally ordered.
//! - `broadcast` copies the member list under the read lock and fans out
//!   after releasing it. Concurrent chat broadcasts may therefore interleave
//!   differently at different recipients; each recipient's queue stays FIFO.
//!
//! The registry never owns a connection. Entries are `Weak` and a member that
//! no longer resolves, or has begun teardown, is skipped without error.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Instant;

use bytes::Bytes;

use wsrelay_core::{Envelope, Kind};

use crate::obs::RelayMetrics;
use crate::realtime::core::Connection;
use crate::realtime::types::ConnectionId;

type Members = HashMap<ConnectionId, Weak<Connection>>;

pub struct Registry {
    members: RwLock<Members>,
    metrics: Arc<RelayMetrics>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Arc::new(RelayMetrics::default()))
    }
}

impl Registry {
    pub fn new(metrics: Arc<RelayMetrics>) -> Self {
        Self {
            members: RwLock::new(HashMap::new()),
            metrics,
        }
    }

    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Add `conn` and announce it to everyone, itself included.
    pub fn join(&self, conn: &Arc<Connection>) {
        let frame = Envelope::system(Kind::Joined, conn.id().as_str()).encode();

        let mut members = self.write();
        members.insert(conn.id().clone(), Arc::downgrade(conn));
        let delivered = self.fan_out(members.values(), &frame);
        let total = members.len();
        drop(members);

        self.metrics.membership_events.inc(&[("event", "join")]);
        tracing::info!(conn_id = %conn.id(), members = total, delivered, "connection joined");
    }

    /// Remove `conn` and announce its departure to the rest. No-op when absent.
    pub fn leave(&self, conn: &Connection) {
        let frame = Envelope::system(Kind::Left, conn.id().as_str()).encode();

        let mut members = self.write();
        if members.remove(conn.id()).is_none() {
            return;
        }
        let delivered = self.fan_out(members.values(), &frame);
        let total = members.len();
        drop(members);

        self.metrics.membership_events.inc(&[("event", "leave")]);
        tracing::info!(conn_id = %conn.id(), members = total, delivered, "connection left");
    }

    /// Deliver `env` to every live member. Returns how many accepted it.
    pub fn broadcast(&self, env: &Envelope) -> usize {
        let started = Instant::now();
        let frame = env.encode();

        let snapshot: Vec<Weak<Connection>> = self.read().values().cloned().collect();
        let delivered = self.fan_out(snapshot.iter(), &frame);

        self.metrics.broadcasts.inc(&[("kind", env.kind().as_str())]);
        self.metrics.fanout_duration.observe(&[], started.elapsed());
        delivered
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.read().contains_key(id)
    }

    pub fn member_ids(&self) -> Vec<ConnectionId> {
        self.read().keys().cloned().collect()
    }

    fn fan_out<'a>(
        &self,
        members: impl Iterator<Item = &'a Weak<Connection>>,
        frame: &Bytes,
    ) -> usize {
        let mut delivered = 0;
        for weak in members {
            let accepted = weak
                .upgrade()
                .map(|conn| conn.enqueue_frame(frame.clone()))
                .unwrap_or(false);
            if accepted {
                delivered += 1;
            } else {
                tracing::trace!("skipped member mid-teardown");
                self.metrics.stale_skips.inc(&[]);
            }
        }
        delivered
    }

    fn read(&self) -> RwLockReadGuard<'_, Members> {
        self.members.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Members> {
        self.members.write().unwrap_or_else(PoisonError::into_inner)
    }
}
