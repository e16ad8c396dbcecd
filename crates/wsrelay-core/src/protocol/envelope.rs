//! Relay envelope (JSON text frame).
//!
//! Decoding is permissive about *missing* optional fields and strict about
//! *present-but-invalid* ones:
//! - `sender` is mandatory.
//! - `kind` (alias `action`) defaults to `chat`.
//! - `contents` defaults to `""`, `timestamp` to `0`.
//!
//! Encoding is total and always emits all four fields.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

/// Sender name stamped on relay-generated envelopes.
pub const SYSTEM_SENDER: &str = "system";

/// Envelope kind (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// A connection joined; `contents` carries its id.
    #[serde(alias = "connect")]
    Joined,
    /// User text.
    #[default]
    Chat,
    /// A connection left; `contents` carries its id.
    #[serde(alias = "disconnect")]
    Left,
    /// Private diagnostic for the receiving client.
    Error,
}

impl Kind {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Joined => "joined",
            Kind::Chat => "chat",
            Kind::Left => "left",
            Kind::Error => "error",
        }
    }
}

/// Unit exchanged with clients. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    sender: String,
    #[serde(default, alias = "action")]
    kind: Kind,
    #[serde(default)]
    contents: String,
    #[serde(default)]
    timestamp: i64,
}

impl Envelope {
    pub fn new(
        sender: impl Into<String>,
        kind: Kind,
        contents: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            sender: sender.into(),
            kind,
            contents: contents.into(),
            timestamp,
        }
    }

    /// Relay-generated envelope: `sender = "system"`, stamped now.
    pub fn system(kind: Kind, contents: impl Into<String>) -> Self {
        Self::new(SYSTEM_SENDER, kind, contents, now_nanos())
    }

    /// Chat envelope from `sender`, stamped now.
    pub fn chat(sender: impl Into<String>, contents: impl Into<String>) -> Self {
        Self::new(sender, Kind::Chat, contents, now_nanos())
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// Nanoseconds since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Decode one frame payload.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        // serde would also accept a JSON array for a struct; the wire is objects only.
        match payload.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => {}
            _ => {
                return Err(RelayError::MalformedPayload(
                    "payload must be a JSON object".into(),
                ))
            }
        }
        serde_json::from_slice(payload).map_err(|e| RelayError::MalformedPayload(e.to_string()))
    }

    /// Encode to the wire form. Aliases accepted on decode are never emitted.
    pub fn encode(&self) -> Bytes {
        // two strings, an enum tag and an integer: serialization cannot fail
        serde_json::to_vec(self).map(Bytes::from).unwrap_or_default()
    }
}

/// Current wall-clock time in nanoseconds since the Unix epoch.
pub fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
