//! Shared error type across wsrelay crates.

use thiserror::Error;

/// Stable error codes (logs, metrics labels, tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Inbound bytes did not decode to a valid envelope.
    MalformedPayload,
    /// Read or write failed on one connection.
    TransportFailure,
    /// Invalid listen address or config at launch.
    StartupFailure,
}

impl ErrorCode {
    /// String representation used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MalformedPayload => "MALFORMED_PAYLOAD",
            ErrorCode::TransportFailure => "TRANSPORT_FAILURE",
            ErrorCode::StartupFailure => "STARTUP_FAILURE",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Recovered locally: the origin connection gets a private `error` envelope.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    /// Fatal to the one connection it happened on.
    #[error("transport failure: {0}")]
    TransportFailure(String),
    /// Fatal to the process, before any connection is accepted.
    #[error("startup failure: {0}")]
    StartupFailure(String),
}

impl RelayError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            RelayError::MalformedPayload(_) => ErrorCode::MalformedPayload,
            RelayError::TransportFailure(_) => ErrorCode::TransportFailure,
            RelayError::StartupFailure(_) => ErrorCode::StartupFailure,
        }
    }
}
