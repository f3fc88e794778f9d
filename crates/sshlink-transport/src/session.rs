//! Command channels multiplexed over a connection

use crate::TransportError;
use ssh2::Channel;
use std::io::{self, Read};
use tracing::debug;

/// A single-use command channel.
///
/// One session runs at most one command. Callers must `close` it once the
/// command is done; exit information is only final after a successful close.
pub trait RemoteSession {
    /// Submit `command` for remote execution
    fn exec(&mut self, command: &str) -> Result<(), TransportError>;

    /// Reader over the command's standard output
    fn stdout(&mut self) -> Box<dyn Read + '_>;

    /// Reader over the command's standard error
    fn stderr(&mut self) -> Box<dyn Read + '_>;

    /// Wait for the command to finish and close the channel.
    ///
    /// Unread output is discarded. Calling this twice is a no-op.
    fn close(&mut self) -> Result<(), TransportError>;

    /// Whether `close` has already run
    fn is_closed(&self) -> bool;

    /// Name of the signal that terminated the command, if any
    fn exit_signal(&self) -> Result<Option<String>, TransportError>;

    /// Numeric exit status reported by the remote side
    fn exit_status(&self) -> Result<i32, TransportError>;
}

/// [`RemoteSession`] backed by a libssh2 channel
pub struct Ssh2Session {
    channel: Channel,
    executed: bool,
    closed: bool,
}

impl Ssh2Session {
    pub(crate) fn new(channel: Channel) -> Self {
        Self {
            channel,
            executed: false,
            closed: false,
        }
    }
}

impl RemoteSession for Ssh2Session {
    fn exec(&mut self, command: &str) -> Result<(), TransportError> {
        debug!("Executing remote command: {}", command);
        self.channel.exec(command)?;
        self.executed = true;
        Ok(())
    }

    fn stdout(&mut self) -> Box<dyn Read + '_> {
        Box::new(&mut self.channel)
    }

    fn stderr(&mut self) -> Box<dyn Read + '_> {
        Box::new(self.channel.stderr())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // A channel whose exec was refused has no process behind it, so
        // there is nothing to drain and no EOF will ever arrive.
        if self.executed {
            self.channel.send_eof()?;
            let discarded = io::copy(&mut self.channel, &mut io::sink())?
                + io::copy(&mut self.channel.stderr(), &mut io::sink())?;
            if discarded > 0 {
                debug!("Discarded {} unread bytes of command output", discarded);
            }
        }

        self.channel.close()?;
        self.channel.wait_close()?;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn exit_signal(&self) -> Result<Option<String>, TransportError> {
        Ok(self.channel.exit_signal()?.exit_signal)
    }

    fn exit_status(&self) -> Result<i32, TransportError> {
        Ok(self.channel.exit_status()?)
    }
}
