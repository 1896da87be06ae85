//! Discovery session error types

use protocol::{DecodeError, op_status_string};
use std::io;
use thiserror::Error;

/// Errors that abort a device-list exchange
///
/// Every variant is fatal to the exchange it came from; no partial device
/// list is ever returned alongside one.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Writing the request or reading the reply failed
    #[error("Transport error: {0}")]
    Transport(#[source] io::Error),

    /// The stream ended before a complete frame arrived
    #[error("Truncated reply: stream ended inside {frame} ({expected} bytes expected)")]
    Truncated { frame: &'static str, expected: usize },

    /// The peer answered with a failure status
    #[error("Remote rejected request: {reason} (status {status})")]
    RemoteRejected { status: i32, reason: &'static str },

    /// The peer sent structurally invalid or implausible data
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),
}

impl SessionError {
    pub fn rejected(status: i32) -> Self {
        Self::RemoteRejected {
            status,
            reason: op_status_string(status),
        }
    }
}

impl From<DecodeError> for SessionError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Truncated { expected, .. } => Self::Truncated {
                frame: "frame",
                expected,
            },
            other => Self::ProtocolViolation(other.to_string()),
        }
    }
}

/// Type alias for session results
pub type Result<T> = std::result::Result<T, SessionError>;
