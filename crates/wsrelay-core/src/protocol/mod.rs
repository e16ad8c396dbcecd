//! Protocol modules.
//!
//! One JSON object per WebSocket frame, described by [`envelope::Envelope`].
//! The decoder is panic-free: malformed input is reported as `RelayError`
//! so a hostile client can only ever hurt its own session.

pub mod envelope;
