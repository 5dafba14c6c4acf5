//! Run a shell command with console echo and print the completion report.
//!
//! ```bash
//! cargo run --example basic
//! ```

use execmux::exec::authorize::Whitelist;
use execmux::exec::command::ExecCommand;
use execmux::exec::options::RunOptions;
use execmux::exec::runner::CommandRunner;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    let command = ExecCommand::new("sh").args(["-c", "echo hello; echo oops 1>&2"]);
    #[cfg(windows)]
    let command =
        ExecCommand::new("powershell").args(["-Command", "echo hello; [Console]::Error.WriteLine('oops')"]);

    let runner = CommandRunner::new(command, RunOptions::new().echo(true));
    let outcome = runner.run(&Whitelist::privileged()).await?;

    println!(
        "exit code: {:?}, reason: {:?}",
        outcome.exit_code, outcome.reason
    );
    Ok(())
}
