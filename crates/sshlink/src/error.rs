//! Error types for sshlink

use sshlink_transport::TransportError;
use std::io;
use thiserror::Error;

/// Main error type for sshlink operations
#[derive(Debug, Error)]
pub enum SshlinkError {
    /// I/O errors from the socket, the local file system or a response handler
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors reported by the SSH library
    #[error("Transport error: {0}")]
    Transport(TransportError),

    /// No authenticated connection is available
    #[error("Not connected: call connect() and check that it returned true")]
    NotConnected,
}

impl From<TransportError> for SshlinkError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(e) => Self::Io(e),
            TransportError::NotConnected => Self::NotConnected,
            other => Self::Transport(other),
        }
    }
}

impl From<SshlinkError> for io::Error {
    fn from(err: SshlinkError) -> Self {
        match err {
            SshlinkError::Io(e) => e,
            SshlinkError::Transport(e) => e.into(),
            SshlinkError::NotConnected => io::Error::new(io::ErrorKind::NotConnected, "not connected"),
        }
    }
}
