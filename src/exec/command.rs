use serde::{Deserialize, Serialize};

use crate::exec::error::ExecError;

/// Task type tag queue transports attach to serialized command payloads.
pub const PAYLOAD_KIND: &str = "exec:command";

/// Which output stream of the child process a value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamSource {
    /// Standard output stream
    Stdout,
    /// Standard error stream
    Stderr,
}

impl std::fmt::Display for StreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamSource::Stdout => write!(f, "stdout"),
            StreamSource::Stderr => write!(f, "stderr"),
        }
    }
}

/// A fully parsed command, ready to be enqueued or executed.
///
/// Redirect targets are plain strings where the empty string means "no
/// redirect"; the wire record keeps that convention, so a round trip through
/// [`to_payload`](ExecCommand::to_payload) and
/// [`from_payload`](ExecCommand::from_payload) is lossless.
///
/// # Examples
///
/// ```
/// use execmux::exec::command::ExecCommand;
///
/// let command = ExecCommand::new("ffmpeg")
///     .args(["-i", "in.mp4", "out.mp4"])
///     .stdout_file("/tmp/encode.log");
///
/// assert_eq!(command.stdout_target(), Some("/tmp/encode.log"));
/// assert_eq!(command.stderr_target(), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecCommand {
    /// Name of the executable to spawn
    pub name: String,
    /// Arguments passed to the executable, redirect tokens already removed
    pub args: Vec<String>,
    /// File receiving the child's stdout; empty means no file redirect
    pub stdout_file: String,
    /// File receiving the child's stderr; empty means no file redirect
    pub stderr_file: String,
}

impl ExecCommand {
    /// Create a command with no arguments and no redirects.
    pub fn new(name: impl Into<String>) -> Self {
        ExecCommand {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the command arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the stdout redirect target.
    pub fn stdout_file(mut self, path: impl Into<String>) -> Self {
        self.stdout_file = path.into();
        self
    }

    /// Set the stderr redirect target.
    pub fn stderr_file(mut self, path: impl Into<String>) -> Self {
        self.stderr_file = path.into();
        self
    }

    /// Stdout redirect target, or `None` when the command has none.
    pub fn stdout_target(&self) -> Option<&str> {
        if self.stdout_file.is_empty() {
            None
        } else {
            Some(&self.stdout_file)
        }
    }

    /// Stderr redirect target, or `None` when the command has none.
    pub fn stderr_target(&self) -> Option<&str> {
        if self.stderr_file.is_empty() {
            None
        } else {
            Some(&self.stderr_file)
        }
    }

    /// Serialize into the wire record carried by queue payloads.
    ///
    /// Field names follow the `name` / `args` / `stdoutFile` / `stderrFile`
    /// convention so payloads interoperate with existing producers.
    pub fn to_payload(&self) -> Result<Vec<u8>, ExecError> {
        serde_json::to_vec(self).map_err(|e| ExecError::Payload(e.to_string()))
    }

    /// Decode a wire record produced by [`to_payload`](Self::to_payload).
    ///
    /// Malformed records and records missing any field fail with
    /// [`ExecError::Payload`]; decoded commands are then validated.
    pub fn from_payload(payload: &[u8]) -> Result<Self, ExecError> {
        let command: ExecCommand =
            serde_json::from_slice(payload).map_err(|e| ExecError::Payload(e.to_string()))?;
        command.validate()?;
        Ok(command)
    }

    /// Check the command against the data model before it reaches a spawner.
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.name.is_empty() {
            return Err(ExecError::InvalidCommand(
                "command name cannot be empty".to_string(),
            ));
        }
        if self.name.contains('\0') {
            return Err(ExecError::InvalidCommand(
                "command name contains null byte".to_string(),
            ));
        }
        for arg in &self.args {
            if arg.contains('\0') {
                return Err(ExecError::InvalidCommand(
                    "command argument contains null byte".to_string(),
                ));
            }
        }
        if self.stdout_file.contains('\0') || self.stderr_file.contains('\0') {
            return Err(ExecError::InvalidCommand(
                "redirect path contains null byte".to_string(),
            ));
        }
        Ok(())
    }
}
