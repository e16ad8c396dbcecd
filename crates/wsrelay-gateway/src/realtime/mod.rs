//! Realtime runtime for the relay.
//!
//! `Connection` owns a client's outbound queue; `Registry` owns membership
//! and fan-out.

pub mod core;
pub mod types;

pub use self::core::{Connection, Registry};
pub use types::{ConnectionId, FrameSink, WriteState};
