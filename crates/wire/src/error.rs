//! Wire protocol errors

use std::time::Duration;

use thiserror::Error;

/// Result type alias for wire operations
pub type Result<T> = std::result::Result<T, WireError>;

/// Errors raised by the protocol server and client
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WireError {
    /// Socket-level failure
    #[error("I/O error during {context}: {reason}")]
    Io { context: String, reason: String },

    /// A frame header announced more than the protocol allows
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    /// Malformed envelope or reply
    #[error("protocol error: {reason}")]
    Protocol { reason: String },

    /// The server answered with an error reply
    #[error("command failed ({code}): {message}")]
    Command { code: i32, message: String },

    /// No reply within the configured per-operation timeout
    #[error("timeout: {op} after {millis}ms")]
    Timeout { op: String, millis: u64 },

    /// The peer closed the connection
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// The listener could not be bound
    #[error("cannot bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    /// The server task did not acknowledge readiness
    #[error("server not ready: {reason}")]
    NotReady { reason: String },
}

impl WireError {
    pub(crate) fn io(context: &str, err: std::io::Error) -> Self {
        WireError::Io {
            context: context.to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn protocol(reason: impl Into<String>) -> Self {
        WireError::Protocol {
            reason: reason.into(),
        }
    }

    pub(crate) fn timeout(op: &str, after: Duration) -> Self {
        WireError::Timeout {
            op: op.to_string(),
            millis: after.as_millis() as u64,
        }
    }

    /// True for per-operation timeouts
    pub fn is_timeout(&self) -> bool {
        matches!(self, WireError::Timeout { .. })
    }
}
