use crate::exec::authorize::Whitelist;
use crate::exec::command::StreamSource;
use crate::exec::options::RunOptions;
use crate::exec::outcome::StopReason;
use crate::exec::runner::CommandRunner;
use crate::exec::runner::integration_tests::helper::{capture_string, shell_command};
use crate::exec::runner::sink::MemorySink;

#[tokio::test]
async fn captures_stdout_lines_in_order() {
    let command = shell_command("echo one; echo two; echo three");
    let mut runner = CommandRunner::new(command, RunOptions::new());
    let sink = MemorySink::new();
    let captured = sink.contents();
    runner.attach_sink(StreamSource::Stdout, Box::new(sink));

    let outcome = runner.run(&Whitelist::privileged()).await.unwrap();

    assert!(outcome.success());
    assert_eq!(outcome.reason, StopReason::Exited);
    let text = capture_string(&captured);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, ["one", "two", "three"]);
}

#[tokio::test]
async fn stderr_routes_to_its_own_sinks() {
    #[cfg(unix)]
    let command = shell_command("echo out; echo err 1>&2");
    #[cfg(windows)]
    let command = shell_command("echo out; [Console]::Error.WriteLine('err')");

    let mut runner = CommandRunner::new(command, RunOptions::new());
    let out_sink = MemorySink::new();
    let err_sink = MemorySink::new();
    let out = out_sink.contents();
    let err = err_sink.contents();
    runner.attach_sink(StreamSource::Stdout, Box::new(out_sink));
    runner.attach_sink(StreamSource::Stderr, Box::new(err_sink));

    let outcome = runner.run(&Whitelist::privileged()).await.unwrap();

    assert!(outcome.success());
    assert_eq!(capture_string(&out).trim(), "out");
    assert_eq!(capture_string(&err).trim(), "err");
}

#[tokio::test]
async fn echo_to_console_runs_to_completion() {
    let command = shell_command("echo visible");
    let runner = CommandRunner::new(command, RunOptions::new().echo(true));

    let outcome = runner.run(&Whitelist::privileged()).await.unwrap();

    assert!(outcome.success());
}

#[tokio::test]
async fn nonzero_exit_is_a_normal_outcome() {
    let command = shell_command("exit 3");
    let runner = CommandRunner::new(command, RunOptions::new());

    let outcome = runner.run(&Whitelist::privileged()).await.unwrap();

    assert_eq!(outcome.exit_code, Some(3));
    assert_eq!(outcome.reason, StopReason::Exited);
    assert!(!outcome.success());
}

#[tokio::test]
async fn output_without_destinations_is_drained() {
    // Plenty of output and nowhere to send it; the run must still finish.
    #[cfg(unix)]
    let command = shell_command("i=0; while [ $i -lt 300 ]; do echo line$i; i=$((i+1)); done");
    #[cfg(windows)]
    let command = shell_command("for ($i = 0; $i -lt 300; $i++) { echo line$i }");

    let runner = CommandRunner::new(command, RunOptions::new());
    let outcome = runner.run(&Whitelist::privileged()).await.unwrap();
    assert!(outcome.success());
}

#[tokio::test]
async fn carriage_return_progress_is_captured() {
    #[cfg(unix)]
    let command = shell_command("printf 'a\\rb\\rdone\\n'");
    #[cfg(windows)]
    let command = shell_command("Write-Host \"a`rb`rdone\"");

    let mut runner = CommandRunner::new(command, RunOptions::new());
    let sink = MemorySink::new();
    let captured = sink.contents();
    runner.attach_sink(StreamSource::Stdout, Box::new(sink));

    let outcome = runner.run(&Whitelist::privileged()).await.unwrap();

    assert!(outcome.success());
    // Chunks arrive per `\r` update but concatenate back to the raw bytes.
    assert!(capture_string(&captured).starts_with("a\rb\rdone"));
}
