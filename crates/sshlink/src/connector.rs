//! Connection lifecycle, command execution and file transfer

use crate::{ConnectorConfig, ExecStatus, ResponseHandler, Result, SshlinkError};
use sshlink_transport::{RemoteSession, Ssh2Transport, Transport};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Password-authenticated connection to a single remote host.
///
/// Each command runs on its own session, opened and closed within the call.
/// The connector is not meant to be shared between threads; every operation
/// takes `&mut self`.
pub struct SshConnector<T: Transport = Ssh2Transport> {
    /// Credentials and settings
    config: ConnectorConfig,
    /// Underlying connection handle
    transport: T,
    /// Whether the last `connect` authenticated
    authenticated: bool,
}

impl SshConnector<Ssh2Transport> {
    /// Create an unconnected connector backed by libssh2
    pub fn new(config: ConnectorConfig) -> Self {
        Self::with_transport(config, Ssh2Transport::new())
    }
}

impl<T: Transport> SshConnector<T> {
    /// Create an unconnected connector over a custom transport
    pub fn with_transport(config: ConnectorConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            authenticated: false,
        }
    }

    /// Connect to the host and try password authentication.
    ///
    /// Returns `Ok(false)` if the server rejected the credentials. Network
    /// and handshake failures are errors.
    pub fn connect(&mut self) -> Result<bool> {
        if self.transport.is_connected() {
            debug!("Replacing existing connection to {}", self.config.host);
            self.close();
        }
        self.authenticated = false;

        let options = self.config.connect_options();
        self.transport.connect(&self.config.host, self.config.port, &options)?;
        self.authenticated = self
            .transport
            .authenticate_password(&self.config.username, &self.config.password)?;

        if self.authenticated {
            info!("Authenticated as {}@{}:{}", self.config.username, self.config.host, self.config.port);
        } else {
            warn!(
                "Password authentication failed for {}@{}:{}",
                self.config.username, self.config.host, self.config.port
            );
        }
        Ok(self.authenticated)
    }

    /// Release the connection if one was authenticated; otherwise do nothing
    pub fn close(&mut self) {
        if self.transport.is_connected() && self.authenticated {
            match self.transport.disconnect() {
                Ok(()) => info!("Closed connection to {}", self.config.host),
                Err(e) => warn!("Error closing connection to {}: {}", self.config.host, e),
            }
        }
        self.authenticated = false;
    }

    /// Whether an authenticated connection is held
    pub fn is_authenticated(&self) -> bool {
        self.authenticated && self.transport.is_connected()
    }

    /// Open a new session; the caller is responsible for closing it
    pub fn open_session(&mut self) -> Result<T::Session> {
        self.ensure_authenticated()?;
        Ok(self.transport.open_session()?)
    }

    /// Run `command`, wait for it to finish and report how it ended.
    ///
    /// Output is discarded. See [`ExecStatus`] for what `success` means.
    pub fn exec_cmd(&mut self, command: &str) -> Result<ExecStatus> {
        self.run(command, None)
    }

    /// Run `command` and let `handler` consume its output before the session
    /// is closed. The handler runs on this thread; if it never returns,
    /// neither does this call.
    pub fn exec_cmd_with(&mut self, command: &str, handler: &mut dyn ResponseHandler) -> Result<ExecStatus> {
        self.run(command, Some(handler))
    }

    fn run(&mut self, command: &str, handler: Option<&mut dyn ResponseHandler>) -> Result<ExecStatus> {
        let mut session = self.open_session()?;
        debug!("Running on {}: {}", self.config.host, command);

        let outcome = drive(&mut session, command, handler);
        let closed = session.close();
        if let Err(e) = outcome {
            if let Err(close_err) = closed {
                warn!("Failed to close session after error: {}", close_err);
            }
            return Err(e);
        }
        closed?;

        let status = ExecStatus::from_exit(session.exit_signal()?, Some(session.exit_status()?));
        debug!(
            "Command on {} finished: success={} exit_code={:?} signal={:?}",
            self.config.host,
            status.success(),
            status.exit_code(),
            status.message()
        );
        Ok(status)
    }

    /// Copy `remote_file` into `local_dir` and return the local path
    pub fn download(&mut self, remote_file: &str, local_dir: impl AsRef<Path>) -> Result<PathBuf> {
        self.ensure_authenticated()?;
        Ok(self.transport.scp_get(remote_file, local_dir.as_ref())?)
    }

    /// Copy each remote file into `local_dir`, stopping at the first failure
    pub fn download_many<I, S>(&mut self, remote_files: I, local_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_authenticated()?;
        let local_dir = local_dir.as_ref();
        remote_files
            .into_iter()
            .map(|remote| -> Result<PathBuf> { Ok(self.transport.scp_get(remote.as_ref(), local_dir)?) })
            .collect()
    }

    /// Copy `local_file` into `remote_dir` and return the remote path
    pub fn upload(&mut self, local_file: impl AsRef<Path>, remote_dir: &str) -> Result<String> {
        self.ensure_authenticated()?;
        let mode = self.config.file_mode;
        Ok(self.transport.scp_put(local_file.as_ref(), remote_dir, mode)?)
    }

    /// Copy each local file into `remote_dir`, stopping at the first failure
    pub fn upload_many<I, P>(&mut self, local_files: I, remote_dir: &str) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.ensure_authenticated()?;
        let mode = self.config.file_mode;
        local_files
            .into_iter()
            .map(|local| -> Result<String> { Ok(self.transport.scp_put(local.as_ref(), remote_dir, mode)?) })
            .collect()
    }

    /// Write `data` as `remote_dir/remote_file_name` and return the remote path
    pub fn upload_bytes(&mut self, data: &[u8], remote_file_name: &str, remote_dir: &str) -> Result<String> {
        self.ensure_authenticated()?;
        let mode = self.config.file_mode;
        Ok(self.transport.scp_put_bytes(data, remote_file_name, remote_dir, mode)?)
    }

    /// Current settings
    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Remote host
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Change the host used by the next `connect`
    pub fn set_host(&mut self, host: impl Into<String>) {
        self.config.host = host.into();
    }

    /// Remote port
    pub fn port(&self) -> u16 {
        self.config.port
    }

    /// Change the port used by the next `connect`
    pub fn set_port(&mut self, port: u16) {
        self.config.port = port;
    }

    /// Login name
    pub fn username(&self) -> &str {
        &self.config.username
    }

    /// Change the login name used by the next `connect`
    pub fn set_username(&mut self, username: impl Into<String>) {
        self.config.username = username.into();
    }

    /// Login password
    pub fn password(&self) -> &str {
        &self.config.password
    }

    /// Change the password used by the next `connect`
    pub fn set_password(&mut self, password: impl Into<String>) {
        self.config.password = password.into();
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport, mutably
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn ensure_authenticated(&self) -> Result<()> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(SshlinkError::NotConnected)
        }
    }
}

impl<T: Transport> Drop for SshConnector<T> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Submit the command and hand the live session to the handler
fn drive<S: RemoteSession>(session: &mut S, command: &str, handler: Option<&mut dyn ResponseHandler>) -> Result<()> {
    session.exec(command)?;
    if let Some(handler) = handler {
        handler.handle(session)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests;
