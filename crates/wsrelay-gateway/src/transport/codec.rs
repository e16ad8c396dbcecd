//! Inbound message classification.
//!
//! - Text and Binary frames => payload bytes for envelope decoding
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;
use bytes::Bytes;

#[derive(Debug)]
pub enum Inbound {
    Frame(Bytes),
    Ping,
    Pong,
    Close,
}

pub fn decode(msg: Message) -> Inbound {
    match msg {
        Message::Text(s) => Inbound::Frame(Bytes::from(s)),
        Message::Binary(b) => Inbound::Frame(Bytes::from(b)),
        Message::Ping(_) => Inbound::Ping,
        Message::Pong(_) => Inbound::Pong,
        Message::Close(_) => Inbound::Close,
    }
}
