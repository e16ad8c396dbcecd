//! wsrelay gateway library entry.
//!
//! This crate wires the WebSocket transport, the connection registry and
//! per-connection delivery pipeline, ops endpoints and metrics into one relay.
//! It is consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod realtime;
pub mod router;
pub mod server;
pub mod transport;
