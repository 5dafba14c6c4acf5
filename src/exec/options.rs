/// Options controlling a single command execution.
///
/// Built the same way as [`ExecCommand`](crate::exec::command::ExecCommand):
/// start from [`RunOptions::new`] and chain setters.
///
/// # Examples
///
/// ```
/// use execmux::exec::options::RunOptions;
///
/// let options = RunOptions::new()
///     .echo(true)
///     .allow_file_redirect(true)
///     .timeout_ms(30_000);
///
/// assert!(options.echo);
/// assert_eq!(options.timeout_ms, Some(30_000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Mirror the child's stdout/stderr onto this process's console
    pub echo: bool,
    /// Permit opening the command's redirect targets. When disabled, any
    /// stdout/stderr file on the command is ignored and never created.
    pub allow_file_redirect: bool,
    /// Cancel the run after this many milliseconds
    pub timeout_ms: Option<u64>,
    /// Place the child in its own process group / job object so that
    /// cancellation kills descendants too
    pub use_process_group: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            echo: false,
            allow_file_redirect: false,
            timeout_ms: None,
            use_process_group: true,
        }
    }
}

impl RunOptions {
    /// Defaults: no echo, file redirects ignored, no timeout, process group
    /// enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror child output to the console.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Allow the run to open the command's redirect targets.
    pub fn allow_file_redirect(mut self, allow: bool) -> Self {
        self.allow_file_redirect = allow;
        self
    }

    /// Cancel the run after `timeout` milliseconds.
    pub fn timeout_ms(mut self, timeout: u64) -> Self {
        self.timeout_ms = Some(timeout);
        self
    }

    /// Control whether the child gets its own process group.
    pub fn use_process_group(mut self, use_group: bool) -> Self {
        self.use_process_group = use_group;
        self
    }
}
