//! Connection settings

use serde::{Deserialize, Serialize};
use sshlink_transport::{ConnectOptions, DEFAULT_FILE_MODE};
use std::fmt;
use std::time::Duration;

/// Port used unless the caller picks another one
pub const DEFAULT_PORT: u16 = 22;

/// Credentials and settings for one remote host.
///
/// Nothing here is validated; bad values surface when connecting.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Remote hostname or IP
    pub host: String,
    /// Remote port (default: 22)
    pub port: u16,
    /// Username
    pub username: String,
    /// Password, never serialized
    #[serde(skip_serializing)]
    pub password: String,
    /// TCP connect timeout in milliseconds; `None` or 0 means no limit
    pub connect_timeout_ms: Option<u64>,
    /// Timeout in milliseconds for each blocking SSH call; `None` or 0 means no limit
    pub session_timeout_ms: Option<u64>,
    /// Permission bits for uploaded files
    pub file_mode: i32,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            username: "root".to_string(),
            password: String::new(),
            connect_timeout_ms: None,
            session_timeout_ms: None,
            file_mode: DEFAULT_FILE_MODE,
        }
    }
}

impl ConnectorConfig {
    /// Settings for `username@host:22` with password authentication
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Set the remote port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Give up on the TCP connect after `timeout`
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = Some(millis(timeout));
        self
    }

    /// Bound every blocking SSH call by `timeout`
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout_ms = Some(millis(timeout));
        self
    }

    /// Permission bits for uploaded files (default `0o600`)
    pub fn with_file_mode(mut self, mode: i32) -> Self {
        self.file_mode = mode;
        self
    }

    /// Options handed to the transport on connect
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            connect_timeout: limit(self.connect_timeout_ms),
            session_timeout: limit(self.session_timeout_ms),
        }
    }
}

/// Whole milliseconds, rounding any non-zero remainder up
fn millis(timeout: Duration) -> u64 {
    let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    if timeout.subsec_nanos() % 1_000_000 != 0 {
        ms.saturating_add(1)
    } else {
        ms
    }
}

/// A zero timeout is treated as no timeout
fn limit(ms: Option<u64>) -> Option<Duration> {
    ms.filter(|&ms| ms > 0).map(Duration::from_millis)
}

impl fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("session_timeout_ms", &self.session_timeout_ms)
            .field("file_mode", &format_args!("{:#o}", self.file_mode))
            .finish()
    }
}
