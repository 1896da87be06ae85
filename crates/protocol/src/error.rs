//! Decode error types

use thiserror::Error;

/// Errors produced while decoding a fixed-size USB/IP frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer bytes than the frame requires
    #[error("Truncated frame: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// More bytes than the frame occupies
    #[error("Trailing bytes: expected {expected} bytes, got {actual}")]
    TrailingBytes { expected: usize, actual: usize },

    /// Peer speaks a different USB/IP version
    #[error("Unsupported USB/IP version: {actual:#06x} (expected {expected:#06x})")]
    VersionMismatch { expected: u16, actual: u16 },

    /// Reply carries an operation code other than the one requested
    #[error("Unexpected operation code: {actual:#06x} (expected {expected:#06x})")]
    UnexpectedCode { expected: u16, actual: u16 },
}

/// Type alias for decode results
pub type Result<T> = std::result::Result<T, DecodeError>;
