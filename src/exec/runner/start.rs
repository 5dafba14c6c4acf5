use std::process::Stdio;
use std::time::Duration;

use futures::future::OptionFuture;
use tokio::process::{Child, Command};

use crate::exec::authorize::CommandGate;
use crate::exec::command::StreamSource;
use crate::exec::error::ExecError;
use crate::exec::outcome::{CancelReason, RunOutcome, StopReason};
#[cfg(feature = "process-group")]
use crate::exec::process_group::ProcessGroup;
use crate::exec::runner::CommandRunner;
use crate::exec::runner::reader::spawn_chunk_reader;
use crate::exec::runner::sink::{StreamFan, console_sink, file_sink};

#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;

/// Upper bound on reaping an already killed child.
const REAP_TIMEOUT: Duration = Duration::from_secs(5);

impl CommandRunner {
    /// Run the command to completion.
    ///
    /// The command is validated and authorized through `gate` before
    /// anything is spawned, redirect targets are opened next (create or
    /// truncate), and only then is the child started, in its own process
    /// group when configured. Captured stdout/stderr chunks are fanned out
    /// to their destinations until both streams close, after which the exit
    /// status is collected.
    ///
    /// A non-zero exit code is reported as a normal [`RunOutcome`];
    /// `Err` means the run itself failed (rejected command, unopenable
    /// redirect, spawn failure, lost destination, or a child killed by an
    /// outside signal). Cancellation through the
    /// [`cancel_handle`](CommandRunner::cancel_handle) or the configured
    /// timeout kills the whole process group and reports a cancelled
    /// outcome.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(command = %self.command.name))
    )]
    pub async fn run<G>(mut self, gate: &G) -> Result<RunOutcome, ExecError>
    where
        G: CommandGate + ?Sized,
    {
        self.command.validate()?;
        gate.authorize(&self.command.name)?;

        #[cfg(feature = "tracing")]
        tracing::info!(args = ?self.command.args, "running command");

        let mut stdout_fan = self.build_fan(StreamSource::Stdout).await?;
        let mut stderr_fan = self.build_fan(StreamSource::Stderr).await?;
        for (stream, sink) in std::mem::take(&mut self.extra_sinks) {
            match stream {
                StreamSource::Stdout => stdout_fan.push(sink),
                StreamSource::Stderr => stderr_fan.push(sink),
            }
        }

        let mut cmd = Command::new(&self.command.name);
        cmd.args(&self.command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(feature = "process-group")]
        let mut group: Option<ProcessGroup> = None;
        #[cfg(feature = "process-group")]
        if self.options.use_process_group {
            let mut new_group = ProcessGroup::new();
            cmd = new_group.create_with_command(cmd)?;
            group = Some(new_group);
        }

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            name: self.command.name.clone(),
            source,
        })?;

        #[cfg(feature = "process-group")]
        if let (Some(group), Some(pid)) = (group.as_mut(), child.id()) {
            group.assign_child(pid)?;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(pid = ?child.id(), "child process spawned");

        let stdout = child.stdout.take().ok_or_else(|| {
            ExecError::Runtime("failed to take stdout pipe of child process".to_string())
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            ExecError::Runtime("failed to take stderr pipe of child process".to_string())
        })?;

        let (mut stdout_rx, stdout_task) = spawn_chunk_reader(stdout, StreamSource::Stdout);
        let (mut stderr_rx, stderr_task) = spawn_chunk_reader(stderr, StreamSource::Stderr);

        let timeout_ms = self.options.timeout_ms;
        let timeout: OptionFuture<_> = timeout_ms
            .map(|ms| tokio::time::sleep(Duration::from_millis(ms)))
            .into();
        tokio::pin!(timeout);

        let mut stdout_done = false;
        let mut stderr_done = false;
        let mut cancel_armed = true;
        let mut cancelled: Option<CancelReason> = None;
        let mut fatal: Option<ExecError> = None;
        let mut exit_status: Option<std::process::ExitStatus> = None;

        // The wait arm stays in the loop so cancellation and the timeout
        // keep working on a child that closes its pipes and lives on.
        while exit_status.is_none() || !(stdout_done && stderr_done) {
            tokio::select! {
                chunk = stdout_rx.recv(), if !stdout_done => match chunk {
                    Some(chunk) => {
                        if let Err(e) = stdout_fan.write_chunk(&chunk).await {
                            fatal = Some(e);
                            break;
                        }
                    }
                    None => stdout_done = true,
                },
                chunk = stderr_rx.recv(), if !stderr_done => match chunk {
                    Some(chunk) => {
                        if let Err(e) = stderr_fan.write_chunk(&chunk).await {
                            fatal = Some(e);
                            break;
                        }
                    }
                    None => stderr_done = true,
                },
                status = child.wait(), if exit_status.is_none() => match status {
                    Ok(status) => exit_status = Some(status),
                    Err(e) => {
                        fatal = Some(ExecError::Runtime(format!(
                            "failed to wait for child process: {e}"
                        )));
                        break;
                    }
                },
                reason = &mut self.cancel_rx, if cancel_armed => match reason {
                    Ok(reason) => {
                        #[cfg(feature = "process-group")]
                        kill_process_tree(&mut child, group.as_ref());
                        #[cfg(not(feature = "process-group"))]
                        kill_process_tree(&mut child);
                        cancelled = Some(reason);
                        break;
                    }
                    // Every cancel handle dropped; the run can no longer
                    // be cancelled externally.
                    Err(_) => cancel_armed = false,
                },
                Some(()) = &mut timeout, if timeout_ms.is_some() => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(timeout_ms, "run timed out, killing process group");
                    #[cfg(feature = "process-group")]
                    kill_process_tree(&mut child, group.as_ref());
                    #[cfg(not(feature = "process-group"))]
                    kill_process_tree(&mut child);
                    cancelled = Some(CancelReason::Timeout);
                    break;
                }
            }
        }

        if let Some(err) = fatal {
            stdout_task.abort();
            stderr_task.abort();
            stdout_fan.close().await;
            stderr_fan.close().await;
            return Err(err);
        }

        if let Some(reason) = cancelled {
            // Late chunks are dropped on purpose: after a kill there is no
            // completion accounting, only resource cleanup.
            stdout_task.abort();
            stderr_task.abort();
            stdout_fan.close().await;
            stderr_fan.close().await;

            #[cfg(unix)]
            let mut signal = None;
            match tokio::time::timeout(REAP_TIMEOUT, child.wait()).await {
                Ok(Ok(_status)) => {
                    #[cfg(unix)]
                    {
                        signal = _status.signal();
                    }
                }
                Ok(Err(_e)) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %_e, "failed to reap killed child process");
                }
                Err(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("timed out reaping killed child process");
                }
            }

            #[cfg(feature = "tracing")]
            tracing::info!(reason = ?reason, "run cancelled, process group killed");

            return Ok(RunOutcome {
                exit_code: None,
                reason: StopReason::Cancelled(reason),
                #[cfg(unix)]
                signal,
            });
        }

        if let Err(_e) = stdout_task.await {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_e, "stdout reader task failed");
        }
        if let Err(_e) = stderr_task.await {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_e, "stderr reader task failed");
        }
        stdout_fan.close().await;
        stderr_fan.close().await;

        let Some(status) = exit_status else {
            return Err(ExecError::Runtime(
                "child process exit status was not collected".to_string(),
            ));
        };

        match status.code() {
            Some(code) => {
                #[cfg(feature = "tracing")]
                if code != 0 {
                    tracing::warn!(exit_code = code, "child exited with non-zero status");
                }
                Ok(RunOutcome {
                    exit_code: Some(code),
                    reason: StopReason::Exited,
                    #[cfg(unix)]
                    signal: None,
                })
            }
            None => {
                #[cfg(unix)]
                {
                    Err(ExecError::Signaled(status.signal()))
                }
                #[cfg(not(unix))]
                {
                    Err(ExecError::Signaled(None))
                }
            }
        }
    }

    /// Assemble the destination list for one stream: redirect file first
    /// (when present and permitted), console next, attached sinks last.
    async fn build_fan(&self, stream: StreamSource) -> Result<StreamFan, ExecError> {
        let mut fan = StreamFan::new(stream);
        if self.options.allow_file_redirect {
            let target = match stream {
                StreamSource::Stdout => self.command.stdout_target(),
                StreamSource::Stderr => self.command.stderr_target(),
            };
            if let Some(path) = target {
                fan.push(file_sink(path).await?);
                #[cfg(feature = "tracing")]
                tracing::debug!(stream = %stream, path, "opened redirect file");
            }
        }
        if self.options.echo {
            fan.push(console_sink(stream));
        }
        Ok(fan)
    }
}

/// Kill the child's whole tree: the process group when one is active, the
/// child alone otherwise.
#[cfg(feature = "process-group")]
fn kill_process_tree(child: &mut Child, group: Option<&ProcessGroup>) {
    if let Some(group) = group {
        if group.is_active() {
            match group.kill_group() {
                Ok(()) => return,
                Err(_e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %_e, "process group kill failed, killing child directly");
                }
            }
        }
    }
    kill_child(child);
}

#[cfg(not(feature = "process-group"))]
fn kill_process_tree(child: &mut Child) {
    kill_child(child);
}

fn kill_child(child: &mut Child) {
    if let Err(_e) = child.start_kill() {
        #[cfg(feature = "tracing")]
        tracing::warn!(error = %_e, "failed to kill child process");
    }
}
