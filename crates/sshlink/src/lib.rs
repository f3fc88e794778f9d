//! # sshlink
//!
//! Run shell commands and copy files over a password-authenticated SSH
//! connection to a single host.
//!
//! An [`SshConnector`] owns the connection. Every command gets its own
//! session, which is closed before the call returns. Output can be streamed
//! line by line into a caller-owned queue through [`DefaultResponseHandler`].

#![warn(missing_docs)]

pub use sshlink_transport as transport;

/// Error types for sshlink
pub mod error;

/// Connection settings
pub mod config;

/// Outcome of a remote command
pub mod status;

/// Output line destinations
pub mod sink;

/// Response handlers
pub mod handler;

/// The connector façade
pub mod connector;

pub use error::SshlinkError;
pub use config::{ConnectorConfig, DEFAULT_PORT};
pub use status::ExecStatus;
pub use sink::LineSink;
pub use handler::{ResponseHandler, DefaultResponseHandler, EofTolerantReader};
pub use connector::SshConnector;
pub use sshlink_transport::RemoteSession;

/// Result type alias for sshlink operations
pub type Result<T> = std::result::Result<T, SshlinkError>;
