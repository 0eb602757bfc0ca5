//! # Client Errors
//!
//! Purpose: One error type for the codec, transport, session and pool layers.
//!
//! ## Notes
//! - Store error replies (`-ERR ...`) are *values*, not errors: they travel as
//!   `RespValue::Error` so the caller decides what they mean.
//! - `is_disconnect` is the single place that decides whether a failure is a
//!   dropped transport worth redialing.

use std::io;

use thiserror::Error;

/// Result type for the client crate.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the client crate.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or IO failure while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// The peer closed the stream before a reply arrived.
    #[error("connection closed by peer")]
    Disconnected,
    /// RESP2 framing or parse error.
    #[error("protocol error")]
    Protocol,
    /// Address could not be resolved to any socket address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    /// Dialing the store failed.
    #[error("connect store server {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    /// A pool needs at least one session.
    #[error("pool capacity must be at least 1")]
    InvalidCapacity,
    /// The broker is gone; no session will ever be handed out again.
    #[error("connection pool closed")]
    PoolClosed,
}

impl ClientError {
    /// Returns true when the failure means the transport dropped.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ClientError::Disconnected => true,
            ClientError::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_disconnects() {
        assert!(ClientError::Disconnected.is_disconnect());
        assert!(ClientError::Io(io::Error::from(io::ErrorKind::BrokenPipe)).is_disconnect());
        assert!(ClientError::Io(io::Error::from(io::ErrorKind::UnexpectedEof)).is_disconnect());
        assert!(!ClientError::Io(io::Error::from(io::ErrorKind::TimedOut)).is_disconnect());
        assert!(!ClientError::Protocol.is_disconnect());
        assert!(!ClientError::PoolClosed.is_disconnect());
    }
}
