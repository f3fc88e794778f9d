//! Transport abstraction and the libssh2 implementation

use crate::{scp, RemoteSession, Ssh2Session, TransportError};
use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// libssh2 code for a password (or other credential) the server rejected
const LIBSSH2_ERROR_AUTHENTICATION_FAILED: i32 = -18;

/// Transport abstraction over an SSH client library.
///
/// A transport owns at most one connection at a time. Calling `connect`
/// again replaces the previous connection.
pub trait Transport: Send {
    /// Session type produced by [`Transport::open_session`]
    type Session: RemoteSession;

    /// Open a TCP connection to `host:port` and complete the SSH handshake
    fn connect(&mut self, host: &str, port: u16, options: &ConnectOptions) -> Result<(), TransportError>;

    /// Try password authentication.
    ///
    /// A rejected password is `Ok(false)`; only transport failures are errors.
    fn authenticate_password(&mut self, username: &str, password: &str) -> Result<bool, TransportError>;

    /// Open a new command channel on the live connection
    fn open_session(&mut self) -> Result<Self::Session, TransportError>;

    /// Copy `remote_file` into `local_dir` and return the local path
    fn scp_get(&mut self, remote_file: &str, local_dir: &Path) -> Result<PathBuf, TransportError>;

    /// Copy `local_file` into `remote_dir` and return the remote path
    fn scp_put(&mut self, local_file: &Path, remote_dir: &str, mode: i32) -> Result<String, TransportError>;

    /// Write `data` as `remote_dir/remote_name` and return the remote path
    fn scp_put_bytes(
        &mut self,
        data: &[u8],
        remote_name: &str,
        remote_dir: &str,
        mode: i32,
    ) -> Result<String, TransportError>;

    /// Tear down the connection
    fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Whether a connection is currently held
    fn is_connected(&self) -> bool;
}

/// Optional limits applied while connecting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// TCP connect timeout; `None` or zero blocks until the OS gives up
    pub connect_timeout: Option<Duration>,
    /// Timeout for each blocking libssh2 call; `None` or zero waits forever
    pub session_timeout: Option<Duration>,
}

/// [`Transport`] implemented with libssh2
#[derive(Default)]
pub struct Ssh2Transport {
    /// Live session, present between `connect` and `disconnect`
    session: Option<ssh2::Session>,
}

impl Ssh2Transport {
    /// Create an unconnected transport
    pub fn new() -> Self {
        Self::default()
    }

    fn session(&self) -> Result<&ssh2::Session, TransportError> {
        self.session.as_ref().ok_or(TransportError::NotConnected)
    }
}

impl Transport for Ssh2Transport {
    type Session = Ssh2Session;

    fn connect(&mut self, host: &str, port: u16, options: &ConnectOptions) -> Result<(), TransportError> {
        info!("Connecting to {}:{}", host, port);

        let stream = connect_tcp(host, port, options.connect_timeout)?;

        let mut session = ssh2::Session::new()?;
        if let Some(timeout) = options.session_timeout.filter(|t| !t.is_zero()) {
            session.set_timeout(timeout_millis(timeout));
        }
        session.set_tcp_stream(stream);
        session.handshake()?;

        debug!("SSH handshake with {}:{} complete", host, port);
        self.session = Some(session);
        Ok(())
    }

    fn authenticate_password(&mut self, username: &str, password: &str) -> Result<bool, TransportError> {
        let session = self.session()?;
        match session.userauth_password(username, password) {
            Ok(()) => Ok(session.authenticated()),
            Err(e) if matches!(e.code(), ssh2::ErrorCode::Session(LIBSSH2_ERROR_AUTHENTICATION_FAILED)) => {
                debug!("Password rejected for {}: {}", username, e);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn open_session(&mut self) -> Result<Ssh2Session, TransportError> {
        let channel = self.session()?.channel_session()?;
        Ok(Ssh2Session::new(channel))
    }

    fn scp_get(&mut self, remote_file: &str, local_dir: &Path) -> Result<PathBuf, TransportError> {
        scp::recv_file(self.session()?, remote_file, local_dir)
    }

    fn scp_put(&mut self, local_file: &Path, remote_dir: &str, mode: i32) -> Result<String, TransportError> {
        scp::send_file(self.session()?, local_file, remote_dir, mode)
    }

    fn scp_put_bytes(
        &mut self,
        data: &[u8],
        remote_name: &str,
        remote_dir: &str,
        mode: i32,
    ) -> Result<String, TransportError> {
        scp::send_bytes(self.session()?, data, remote_name, remote_dir, mode)
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        if let Some(session) = self.session.take() {
            debug!("Closing SSH connection");
            session.disconnect(None, "closed by client", None)?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

/// Resolve `host` and connect to the first address that answers
fn connect_tcp(host: &str, port: u16, timeout: Option<Duration>) -> io::Result<TcpStream> {
    let Some(timeout) = timeout.filter(|t| !t.is_zero()) else {
        return TcpStream::connect((host, port));
    };

    let mut last_err = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("Connect to {} failed: {}", addr, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, format!("no addresses resolved for {}", host))
    }))
}

/// libssh2 takes milliseconds as u32, where 0 means no timeout
fn timeout_millis(timeout: Duration) -> u32 {
    u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX).max(1)
}
