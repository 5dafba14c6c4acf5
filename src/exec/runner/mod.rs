//! Command execution: spawning, output capture and cancellation.

use std::sync::Arc;

use tokio::sync::{Mutex, oneshot};

use crate::exec::command::{ExecCommand, StreamSource};
use crate::exec::error::ExecError;
use crate::exec::options::RunOptions;
use crate::exec::outcome::CancelReason;
use crate::exec::runner::sink::ChunkSink;

pub(crate) mod reader;
pub mod sink;
mod start;

#[cfg(test)]
mod integration_tests;

/// Executes one command: authorizes it, resolves its output destinations,
/// spawns the process and drives capture until completion or cancellation.
///
/// A runner is single-use; [`run`](CommandRunner::run) consumes it and
/// returns the completion report.
///
/// # Examples
///
/// ```rust,no_run
/// use execmux::exec::authorize::Whitelist;
/// use execmux::exec::command::ExecCommand;
/// use execmux::exec::options::RunOptions;
/// use execmux::exec::runner::CommandRunner;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let command = ExecCommand::new("ls").args(["-la"]);
/// let runner = CommandRunner::new(command, RunOptions::new().echo(true));
/// let outcome = runner.run(&Whitelist::new(["ls"])).await?;
/// assert!(outcome.success());
/// # Ok(())
/// # }
/// ```
pub struct CommandRunner {
    pub(crate) command: ExecCommand,
    pub(crate) options: RunOptions,
    pub(crate) cancel: CancelHandle,
    pub(crate) cancel_rx: oneshot::Receiver<CancelReason>,
    pub(crate) extra_sinks: Vec<(StreamSource, ChunkSink)>,
}

impl CommandRunner {
    /// Build a runner for an already parsed command.
    pub fn new(command: ExecCommand, options: RunOptions) -> Self {
        let (tx, rx) = oneshot::channel();
        CommandRunner {
            command,
            options,
            cancel: CancelHandle {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            cancel_rx: rx,
            extra_sinks: Vec::new(),
        }
    }

    /// Decode a queue payload and build a runner for it.
    ///
    /// Deserialization happens before any authorization or spawning, so
    /// malformed payloads are rejected without side effects.
    pub fn from_payload(payload: &[u8], options: RunOptions) -> Result<Self, ExecError> {
        let command = ExecCommand::from_payload(payload)?;
        Ok(Self::new(command, options))
    }

    /// The command this runner will execute.
    pub fn command(&self) -> &ExecCommand {
        &self.command
    }

    /// Handle for cancelling the run from another task.
    ///
    /// Handles stay valid after the runner starts; cancelling an already
    /// finished run reports [`ExecError::Channel`].
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Attach an additional destination for one stream.
    ///
    /// Extra sinks come after the file and console destinations in fan-out
    /// order. Tests use this with
    /// [`MemorySink`](crate::exec::runner::sink::MemorySink); workers can
    /// tee output into custom transports the same way.
    pub fn attach_sink(&mut self, stream: StreamSource, sink: ChunkSink) {
        self.extra_sinks.push((stream, sink));
    }
}

impl std::fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRunner")
            .field("command", &self.command)
            .field("options", &self.options)
            .field("extra_sinks", &self.extra_sinks.len())
            .finish_non_exhaustive()
    }
}

/// Requests a hard stop of a running command.
///
/// Clonable; the first successful [`cancel`](CancelHandle::cancel) wins and
/// later calls report [`ExecError::Channel`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<Mutex<Option<oneshot::Sender<CancelReason>>>>,
}

impl CancelHandle {
    /// Send the cancellation signal.
    ///
    /// The runner kills the whole process group and reports a cancelled
    /// outcome carrying `reason`. Fails when the run has already finished
    /// or was already cancelled.
    pub async fn cancel(&self, reason: CancelReason) -> Result<(), ExecError> {
        if let Some(tx) = self.tx.lock().await.take() {
            if tx.send(reason).is_err() {
                #[cfg(feature = "tracing")]
                tracing::warn!(cancel_reason = ?reason, "run already finished, cancel signal not deliverable");
                return Err(ExecError::Channel(
                    "run already finished, cancel signal not deliverable".to_string(),
                ));
            }
        } else {
            #[cfg(feature = "tracing")]
            tracing::warn!(cancel_reason = ?reason, "cancel signal already sent");
            return Err(ExecError::Channel("cancel signal already sent".to_string()));
        }
        Ok(())
    }
}
