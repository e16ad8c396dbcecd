//! Transport layer (WebSocket).
//!
//! Exposes the WS upgrade handler, the codec that classifies inbound
//! messages, and the `FrameSink` that writes relay frames to the socket.

pub mod codec;
pub mod sink;
pub mod ws;
