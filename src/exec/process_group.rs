//! Process-group containment for hard cancellation.
//!
//! Cancelling a run must take down the whole process tree, not just the
//! direct child. On Unix the child is moved into its own session with
//! `setsid()` so the group can be killed with `killpg()`; on Windows a Job
//! Object with kill-on-close set plays the same role. Other platforms report
//! [`ProcessGroupError::UnsupportedPlatform`] and callers fall back to
//! killing the child directly.

use thiserror::Error;
use tokio::process::Command;

/// Error type for process group operations.
#[derive(Debug, Error)]
pub enum ProcessGroupError {
    #[error("failed to create process group/job: {0}")]
    CreationFailed(String),
    #[error("failed to assign process to group/job: {0}")]
    AssignmentFailed(String),
    #[error("failed to signal process group: {0}")]
    SignalFailed(String),

    #[cfg(not(any(unix, windows)))]
    #[error("process groups are not available on this platform: {0}")]
    UnsupportedPlatform(String),
}

#[cfg(windows)]
#[derive(Debug)]
struct JobHandle(windows::Win32::Foundation::HANDLE);

// HANDLEs are raw pointers to kernel objects; moving one between threads is
// fine, the kernel synchronizes access.
#[cfg(windows)]
unsafe impl Send for JobHandle {}

#[cfg(windows)]
unsafe impl Sync for JobHandle {}

/// One child's process group (Unix) or Job Object (Windows).
///
/// The group starts inactive. [`create_with_command`] configures the command
/// before it is spawned, [`assign_child`] activates the group once the pid
/// is known, and [`kill_group`] force-kills every process in it. The Windows
/// job handle is released when the group is dropped.
///
/// [`create_with_command`]: ProcessGroup::create_with_command
/// [`assign_child`]: ProcessGroup::assign_child
/// [`kill_group`]: ProcessGroup::kill_group
#[derive(Debug)]
pub struct ProcessGroup {
    #[cfg(unix)]
    pgid: Option<i32>,
    #[cfg(windows)]
    job: Option<JobHandle>,
}

impl Default for ProcessGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessGroup {
    /// Create an inactive group.
    pub fn new() -> Self {
        ProcessGroup {
            #[cfg(unix)]
            pgid: None,
            #[cfg(windows)]
            job: None,
        }
    }

    /// Whether a child has been assigned to this group.
    pub fn is_active(&self) -> bool {
        #[cfg(unix)]
        {
            self.pgid.is_some()
        }
        #[cfg(windows)]
        {
            self.job.is_some()
        }
        #[cfg(not(any(unix, windows)))]
        {
            false
        }
    }

    /// Configure `command` to start inside this group.
    ///
    /// On Unix the returned command calls `setsid()` between fork and exec.
    /// On Windows this creates the Job Object (kill-on-close) that the child
    /// is assigned to after spawning.
    pub fn create_with_command(
        &mut self,
        #[allow(unused_mut)] mut command: Command,
    ) -> Result<Command, ProcessGroupError> {
        #[cfg(unix)]
        {
            // New session, new process group, child becomes the leader.
            unsafe {
                command.pre_exec(|| {
                    use nix::unistd::setsid;
                    if setsid().is_err() {
                        return Err(std::io::Error::last_os_error());
                    }
                    Ok(())
                });
            }
            Ok(command)
        }
        #[cfg(windows)]
        {
            use windows::Win32::System::JobObjects::{
                CreateJobObjectW, JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE,
                JOBOBJECT_EXTENDED_LIMIT_INFORMATION, JobObjectExtendedLimitInformation,
                SetInformationJobObject,
            };
            use windows::core::PCWSTR;

            let job_handle = unsafe { CreateJobObjectW(None, PCWSTR::null()) }
                .map_err(|e| ProcessGroupError::CreationFailed(format!("CreateJobObjectW: {e}")))?;

            let mut job_info = JOBOBJECT_EXTENDED_LIMIT_INFORMATION::default();
            job_info.BasicLimitInformation.LimitFlags = JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE;

            unsafe {
                SetInformationJobObject(
                    job_handle,
                    JobObjectExtendedLimitInformation,
                    &job_info as *const _ as *const std::ffi::c_void,
                    std::mem::size_of::<JOBOBJECT_EXTENDED_LIMIT_INFORMATION>() as u32,
                )
            }
            .map_err(|e| {
                unsafe {
                    let _ = windows::Win32::Foundation::CloseHandle(job_handle);
                }
                ProcessGroupError::CreationFailed(format!("SetInformationJobObject: {e}"))
            })?;
            self.job = Some(JobHandle(job_handle));

            Ok(command)
        }
        #[cfg(not(any(unix, windows)))]
        {
            let _ = &mut command;
            Err(ProcessGroupError::UnsupportedPlatform(
                "process group management is not implemented here".to_string(),
            ))
        }
    }

    /// Record the spawned child as this group's member.
    ///
    /// On Unix the child is already the group leader after `setsid()`, so
    /// only the pgid is stored. On Windows the process is assigned to the
    /// Job Object; children spawned by it before assignment completes can
    /// escape the job, a known platform race.
    pub fn assign_child(&mut self, child_id: u32) -> Result<(), ProcessGroupError> {
        #[cfg(unix)]
        {
            self.pgid = Some(child_id as i32);
            Ok(())
        }
        #[cfg(windows)]
        {
            use windows::Win32::Foundation::CloseHandle;
            use windows::Win32::System::JobObjects::AssignProcessToJobObject;
            use windows::Win32::System::Threading::{
                OpenProcess, PROCESS_SET_INFORMATION, PROCESS_SET_QUOTA, PROCESS_TERMINATE,
            };

            let process_handle = unsafe {
                OpenProcess(
                    PROCESS_SET_QUOTA | PROCESS_TERMINATE | PROCESS_SET_INFORMATION,
                    false,
                    child_id,
                )
            }
            .map_err(|e| ProcessGroupError::AssignmentFailed(format!("OpenProcess: {e}")))?;

            let result = if let Some(JobHandle(job_handle)) = &self.job {
                unsafe { AssignProcessToJobObject(*job_handle, process_handle) }
            } else {
                unsafe {
                    let _ = CloseHandle(process_handle);
                }
                return Err(ProcessGroupError::AssignmentFailed(
                    "no Job Object handle available".to_string(),
                ));
            };

            unsafe {
                let _ = CloseHandle(process_handle);
            }

            result.map_err(|e| {
                ProcessGroupError::AssignmentFailed(format!("AssignProcessToJobObject: {e}"))
            })?;
            Ok(())
        }
        #[cfg(not(any(unix, windows)))]
        {
            let _ = child_id;
            Err(ProcessGroupError::UnsupportedPlatform(
                "process group assignment is not implemented here".to_string(),
            ))
        }
    }

    /// Force-kill every process in the group.
    ///
    /// Sends SIGKILL to the Unix process group, or terminates the Windows
    /// Job Object. A group whose processes are already gone reports `Ok`.
    /// The job handle stays open so the call is safe to repeat; Drop closes
    /// it.
    pub fn kill_group(&self) -> Result<(), ProcessGroupError> {
        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;

            if let Some(pgid) = self.pgid {
                match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
                    Ok(()) => Ok(()),
                    // Group already gone.
                    Err(Errno::ESRCH) => Ok(()),
                    Err(Errno::EPERM) => Err(ProcessGroupError::SignalFailed(format!(
                        "permission denied killing process group {pgid}"
                    ))),
                    Err(e) => Err(ProcessGroupError::SignalFailed(format!(
                        "failed to send SIGKILL to process group {pgid}: {e}"
                    ))),
                }
            } else {
                Err(ProcessGroupError::SignalFailed(
                    "no process group id available".to_string(),
                ))
            }
        }
        #[cfg(windows)]
        {
            use windows::Win32::System::JobObjects::TerminateJobObject;

            if let Some(JobHandle(job_handle)) = &self.job {
                unsafe { TerminateJobObject(*job_handle, 1) }.map_err(|e| {
                    ProcessGroupError::SignalFailed(format!("TerminateJobObject: {e}"))
                })?;
                Ok(())
            } else {
                Err(ProcessGroupError::SignalFailed(
                    "no Job Object handle available".to_string(),
                ))
            }
        }
        #[cfg(not(any(unix, windows)))]
        {
            Err(ProcessGroupError::UnsupportedPlatform(
                "process group termination is not implemented here".to_string(),
            ))
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        #[cfg(windows)]
        {
            if let Some(JobHandle(job_handle)) = self.job.take() {
                unsafe {
                    let _ = windows::Win32::Foundation::CloseHandle(job_handle);
                }
            }
        }
    }
}
