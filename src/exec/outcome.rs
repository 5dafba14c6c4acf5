use serde::{Deserialize, Serialize};

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The child exited on its own; the exit code carries the status
    Exited,
    /// The run was cancelled and the process group killed
    Cancelled(CancelReason),
}

/// Reason carried by a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    /// Upstream shutdown or stop request
    Shutdown,
    /// The run exceeded its configured timeout
    Timeout,
    /// Explicit user request
    UserRequested,
}

/// Completion report for one command execution.
///
/// A non-zero exit code is still a successful *run*: the process was
/// spawned, its output was captured and it exited on its own. Callers that
/// care about the child's verdict check [`success`](RunOutcome::success) or
/// the code itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Exit status of the child; `None` when the run was cancelled
    pub exit_code: Option<i32>,
    /// How the run ended
    pub reason: StopReason,
    /// Signal that terminated the child, when one did
    #[cfg(unix)]
    pub signal: Option<i32>,
}

impl RunOutcome {
    /// True when the child exited with status 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// True when the run ended through cancellation.
    pub fn cancelled(&self) -> bool {
        matches!(self.reason, StopReason::Cancelled(_))
    }
}
