use std::sync::{Arc, Mutex};

use crate::exec::command::ExecCommand;

/// Wrap a script in the platform shell so tests keep one dialect per
/// platform.
pub(crate) fn shell_command(script: &str) -> ExecCommand {
    #[cfg(unix)]
    {
        ExecCommand::new("sh").args(["-c", script])
    }
    #[cfg(windows)]
    {
        ExecCommand::new("powershell").args(["-Command", script])
    }
}

/// Raw `(name, args)` for the platform shell, for parser round trips.
pub(crate) fn shell_parts(script: &str) -> (&'static str, Vec<String>) {
    #[cfg(unix)]
    {
        ("sh", vec!["-c".to_string(), script.to_string()])
    }
    #[cfg(windows)]
    {
        ("powershell", vec!["-Command".to_string(), script.to_string()])
    }
}

pub(crate) fn capture_string(buf: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8(buf.lock().unwrap().clone()).unwrap()
}
