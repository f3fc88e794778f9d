//! In-process transport for exercising callers without an SSH server
//!
//! [`MockTransport`] accepts one password, answers commands from a script and
//! maps remote paths onto a local directory that stands in for the remote
//! file system. Everything it does is recorded in a shared [`MockLog`].

use crate::{scp, ConnectOptions, RemoteSession, Transport, TransportError};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Scripted behaviour of one remote command
#[derive(Debug, Clone, Default)]
pub struct MockCommand {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_status: i32,
    exit_signal: Option<String>,
    stdout_error: Option<io::ErrorKind>,
    reject_exec: bool,
}

impl MockCommand {
    /// Command that prints `stdout` and exits with status 0
    pub fn output(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Default::default()
        }
    }

    /// Set the standard error text
    pub fn with_stderr(mut self, stderr: impl Into<Vec<u8>>) -> Self {
        self.stderr = stderr.into();
        self
    }

    /// Set the numeric exit status
    pub fn with_exit_status(mut self, status: i32) -> Self {
        self.exit_status = status;
        self
    }

    /// Terminate the command with `signal` (e.g. `"KILL"`)
    pub fn killed_by(mut self, signal: &str) -> Self {
        self.exit_signal = Some(signal.to_string());
        self
    }

    /// Fail the stdout read with `kind` once the scripted output is consumed
    pub fn then_stdout_error(mut self, kind: io::ErrorKind) -> Self {
        self.stdout_error = Some(kind);
        self
    }

    /// Make the server refuse to run the command
    pub fn rejected() -> Self {
        Self {
            reject_exec: true,
            ..Default::default()
        }
    }
}

/// Record of everything a [`MockTransport`] was asked to do
#[derive(Debug, Default, Clone)]
pub struct MockLog {
    /// Successful `connect` calls
    pub connects: usize,
    /// `disconnect` calls that dropped a live connection
    pub disconnects: usize,
    /// Sessions handed out
    pub sessions_opened: usize,
    /// Sessions closed
    pub sessions_closed: usize,
    /// Commands submitted, in order
    pub commands: Vec<String>,
    /// Remote paths written through SCP, in order
    pub uploads: Vec<String>,
    /// Mode bits of each upload, in order
    pub upload_modes: Vec<i32>,
    /// Options passed to the last `connect`
    pub last_options: Option<ConnectOptions>,
}

/// Shared handle onto a [`MockLog`]
#[derive(Debug, Default, Clone)]
pub struct MockLogHandle(Arc<Mutex<MockLog>>);

impl MockLogHandle {
    /// Snapshot of the log
    pub fn snapshot(&self) -> MockLog {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockLog> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Scripted [`Transport`] for tests
pub struct MockTransport {
    password: String,
    remote_root: PathBuf,
    commands: HashMap<String, MockCommand>,
    unreachable: bool,
    connected: bool,
    authenticated: bool,
    log: MockLogHandle,
}

impl MockTransport {
    /// Transport whose remote file system lives under `remote_root`
    pub fn new(remote_root: impl Into<PathBuf>) -> Self {
        Self {
            password: "secret".to_string(),
            remote_root: remote_root.into(),
            commands: HashMap::new(),
            unreachable: false,
            connected: false,
            authenticated: false,
            log: MockLogHandle::default(),
        }
    }

    /// Password the fake server accepts (default `"secret"`)
    pub fn accept_password(mut self, password: &str) -> Self {
        self.password = password.to_string();
        self
    }

    /// Script the response to `command`
    pub fn on_command(mut self, command: &str, behaviour: MockCommand) -> Self {
        self.commands.insert(command.to_string(), behaviour);
        self
    }

    /// Refuse every TCP connection
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Handle onto the shared call log
    pub fn log(&self) -> MockLogHandle {
        self.log.clone()
    }

    /// Local path standing in for `remote`
    pub fn remote_path(&self, remote: &str) -> PathBuf {
        self.remote_root.join(remote.trim_start_matches('/'))
    }

    fn require_auth(&self) -> Result<(), TransportError> {
        if self.connected && self.authenticated {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }

    fn write_remote(&mut self, remote_path: &str, data: &[u8], mode: i32) -> Result<(), TransportError> {
        let target = self.remote_path(remote_path);
        let parent_exists = target.parent().map(Path::is_dir).unwrap_or(false);
        if !parent_exists {
            return Err(TransportError::scp(remote_path, "No such file or directory"));
        }
        fs::write(&target, data)?;

        let mut log = self.log.lock();
        log.uploads.push(remote_path.to_string());
        log.upload_modes.push(mode);
        Ok(())
    }
}

impl Transport for MockTransport {
    type Session = MockSession;

    fn connect(&mut self, _host: &str, _port: u16, options: &ConnectOptions) -> Result<(), TransportError> {
        if self.unreachable {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused").into());
        }
        self.connected = true;
        self.authenticated = false;

        let mut log = self.log.lock();
        log.connects += 1;
        log.last_options = Some(options.clone());
        Ok(())
    }

    fn authenticate_password(&mut self, _username: &str, password: &str) -> Result<bool, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.authenticated = password == self.password;
        Ok(self.authenticated)
    }

    fn open_session(&mut self) -> Result<MockSession, TransportError> {
        self.require_auth()?;
        self.log.lock().sessions_opened += 1;
        Ok(MockSession {
            commands: self.commands.clone(),
            current: None,
            stdout: ScriptedReader::default(),
            stderr: Cursor::new(Vec::new()),
            closed: false,
            log: self.log.clone(),
        })
    }

    fn scp_get(&mut self, remote_file: &str, local_dir: &Path) -> Result<PathBuf, TransportError> {
        self.require_auth()?;
        let name = scp::remote_file_name(remote_file)
            .ok_or_else(|| TransportError::scp(remote_file, "remote path has no file name"))?;
        let source = self.remote_path(remote_file);
        if !source.is_file() {
            return Err(TransportError::scp(remote_file, "No such file or directory"));
        }
        let target = local_dir.join(name);
        fs::copy(&source, &target)?;
        Ok(target)
    }

    fn scp_put(&mut self, local_file: &Path, remote_dir: &str, mode: i32) -> Result<String, TransportError> {
        self.require_auth()?;
        let name = scp::local_file_name(local_file)?;
        let remote_path = scp::remote_join(remote_dir, name);
        let data = fs::read(local_file)?;
        self.write_remote(&remote_path, &data, mode)?;
        Ok(remote_path)
    }

    fn scp_put_bytes(
        &mut self,
        data: &[u8],
        remote_name: &str,
        remote_dir: &str,
        mode: i32,
    ) -> Result<String, TransportError> {
        self.require_auth()?;
        let remote_path = scp::remote_join(remote_dir, remote_name);
        self.write_remote(&remote_path, data, mode)?;
        Ok(remote_path)
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        if self.connected {
            self.log.lock().disconnects += 1;
        }
        self.connected = false;
        self.authenticated = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Session handed out by [`MockTransport`]
pub struct MockSession {
    commands: HashMap<String, MockCommand>,
    current: Option<MockCommand>,
    stdout: ScriptedReader,
    stderr: Cursor<Vec<u8>>,
    closed: bool,
    log: MockLogHandle,
}

impl RemoteSession for MockSession {
    fn exec(&mut self, command: &str) -> Result<(), TransportError> {
        self.log.lock().commands.push(command.to_string());

        let behaviour = self.commands.get(command).cloned().unwrap_or_else(|| {
            MockCommand::output(Vec::new())
                .with_stderr(format!("sh: {}: command not found\n", command))
                .with_exit_status(127)
        });
        if behaviour.reject_exec {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "exec request refused").into());
        }

        self.stdout = ScriptedReader {
            data: Cursor::new(behaviour.stdout.clone()),
            trailing_error: behaviour.stdout_error,
        };
        self.stderr = Cursor::new(behaviour.stderr.clone());
        self.current = Some(behaviour);
        Ok(())
    }

    fn stdout(&mut self) -> Box<dyn Read + '_> {
        Box::new(&mut self.stdout)
    }

    fn stderr(&mut self) -> Box<dyn Read + '_> {
        Box::new(&mut self.stderr)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if !self.closed {
            self.closed = true;
            self.log.lock().sessions_closed += 1;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn exit_signal(&self) -> Result<Option<String>, TransportError> {
        Ok(self.current.as_ref().and_then(|c| c.exit_signal.clone()))
    }

    fn exit_status(&self) -> Result<i32, TransportError> {
        Ok(self.current.as_ref().map(|c| c.exit_status).unwrap_or(0))
    }
}

/// Yields scripted bytes, then optionally fails instead of reporting EOF
#[derive(Default)]
struct ScriptedReader {
    data: Cursor<Vec<u8>>,
    trailing_error: Option<io::ErrorKind>,
}

impl Read for ScriptedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.data.read(buf)?;
        if n == 0 && !buf.is_empty() {
            if let Some(kind) = self.trailing_error {
                return Err(io::Error::new(kind, "channel closed by remote"));
            }
        }
        Ok(n)
    }
}
