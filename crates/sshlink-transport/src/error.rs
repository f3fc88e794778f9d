//! SSH-specific error types

use thiserror::Error;
use std::io;

/// Transport-specific errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error from the socket or the local file system
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error reported by libssh2
    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),

    /// No live connection to operate on
    #[error("Not connected")]
    NotConnected,

    /// Secure copy failed for a specific path
    #[error("SCP transfer of {path} failed: {message}")]
    Scp {
        /// Remote or local path being copied
        path: String,
        /// What went wrong
        message: String,
    },
}

impl TransportError {
    /// Build an SCP error for `path`
    pub fn scp(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Scp {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<TransportError> for io::Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(e) => e,
            TransportError::Ssh(e) => e.into(),
            TransportError::NotConnected => io::Error::new(io::ErrorKind::NotConnected, "not connected"),
            other => io::Error::other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_connected_maps_to_io_kind() {
        let err: io::Error = TransportError::NotConnected.into();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn test_io_error_round_trips() {
        let err: io::Error = TransportError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "gone")).into();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_scp_error_display() {
        let err = TransportError::scp("/tmp/a.txt", "short read");
        assert_eq!(err.to_string(), "SCP transfer of /tmp/a.txt failed: short read");
    }
}
