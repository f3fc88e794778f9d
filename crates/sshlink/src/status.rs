//! Outcome of a remote command

use serde::{Deserialize, Serialize};

/// What happened to one remote command.
///
/// `success` only reflects whether the command was killed by a signal. A
/// command that exits normally with a non-zero code still counts as a
/// success; check [`ExecStatus::exit_code`] when the code matters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecStatus {
    success: bool,
    message: Option<String>,
    exit_code: Option<i32>,
}

impl ExecStatus {
    /// Build a status from the channel's exit signal and exit code
    pub fn from_exit(exit_signal: Option<String>, exit_code: Option<i32>) -> Self {
        Self {
            success: exit_signal.is_none(),
            message: exit_signal,
            exit_code,
        }
    }

    /// `false` iff the command was terminated by a signal
    pub fn success(&self) -> bool {
        self.success
    }

    /// Name of the terminating signal, if any
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Numeric exit code reported by the remote side
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Override the success flag
    pub fn set_success(&mut self, success: bool) {
        self.success = success;
    }

    /// Override the message
    pub fn set_message(&mut self, message: Option<String>) {
        self.message = message;
    }

    /// Override the exit code
    pub fn set_exit_code(&mut self, exit_code: Option<i32>) {
        self.exit_code = exit_code;
    }
}
