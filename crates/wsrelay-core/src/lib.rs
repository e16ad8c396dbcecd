//! wsrelay core: transport-agnostic envelope model and error types.
//!
//! This crate defines the wire-level contract shared by the gateway and by
//! test tooling. It carries no transport or runtime dependencies so it can be
//! reused by clients as well as the relay itself.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed input surfaces as `RelayError::MalformedPayload`, never a crash.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ErrorCode, RelayError, Result};
pub use protocol::envelope::{Envelope, Kind, SYSTEM_SENDER};
