//! # sshlink transport
//!
//! Thin seam over libssh2: connecting, password authentication, command
//! channels and secure copy.
//!
//! ## Testing
//!
//! Unit tests run against `test_utils::MockTransport` (feature
//! `test-utils`). Code that only runs on a live libssh2 channel, such as
//! the output drain in [`Ssh2Session`]'s `close` and the end-of-transfer
//! handshake in [`scp`], is exercised by `crates/sshlink/tests/live_server.rs`.
//! Those tests are skipped unless `SSHLINK_TEST_HOST`, `SSHLINK_TEST_USER`
//! and `SSHLINK_TEST_PASSWORD` point at a reachable server.

#![warn(missing_docs)]

/// Transport abstraction and implementations
pub mod transport;

/// Command channels
pub mod session;

/// Secure copy helpers
pub mod scp;

/// SSH-specific error types
pub mod error;

/// Scripted transport for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use transport::{Transport, Ssh2Transport, ConnectOptions};
pub use session::{RemoteSession, Ssh2Session};
pub use scp::DEFAULT_FILE_MODE;
pub use error::TransportError;
