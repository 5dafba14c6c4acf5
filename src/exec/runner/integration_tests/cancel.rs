use std::time::{Duration, Instant};

use crate::exec::authorize::Whitelist;
use crate::exec::error::ExecError;
use crate::exec::options::RunOptions;
use crate::exec::outcome::{CancelReason, StopReason};
use crate::exec::runner::CommandRunner;
use crate::exec::runner::integration_tests::helper::shell_command;

#[tokio::test]
async fn cancel_kills_the_run_promptly() {
    let command = shell_command("sleep 5");
    let runner = CommandRunner::new(command, RunOptions::new());
    let handle = runner.cancel_handle();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        handle.cancel(CancelReason::Shutdown).await.unwrap();
    });

    let started = Instant::now();
    let outcome = runner.run(&Whitelist::privileged()).await.unwrap();
    canceller.await.unwrap();

    assert_eq!(outcome.exit_code, None);
    assert_eq!(outcome.reason, StopReason::Cancelled(CancelReason::Shutdown));
    assert!(outcome.cancelled());
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn timeout_cancels_with_timeout_reason() {
    let command = shell_command("sleep 5");
    let runner = CommandRunner::new(command, RunOptions::new().timeout_ms(300));

    let started = Instant::now();
    let outcome = runner.run(&Whitelist::privileged()).await.unwrap();

    assert_eq!(outcome.exit_code, None);
    assert_eq!(outcome.reason, StopReason::Cancelled(CancelReason::Timeout));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[cfg(unix)]
#[tokio::test]
async fn cancel_reaches_a_child_that_closed_its_pipes() {
    // Both output streams close immediately; the kill path must stay live.
    let command = shell_command("exec >/dev/null 2>&1; sleep 5");
    let runner = CommandRunner::new(command, RunOptions::new());
    let handle = runner.cancel_handle();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        handle.cancel(CancelReason::Shutdown).await.unwrap();
    });

    let started = Instant::now();
    let outcome = runner.run(&Whitelist::privileged()).await.unwrap();
    canceller.await.unwrap();

    assert_eq!(outcome.reason, StopReason::Cancelled(CancelReason::Shutdown));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[cfg(unix)]
#[tokio::test]
async fn timeout_fires_after_child_closes_its_pipes() {
    let command = shell_command("exec >/dev/null 2>&1; sleep 5");
    let runner = CommandRunner::new(command, RunOptions::new().timeout_ms(300));

    let started = Instant::now();
    let outcome = runner.run(&Whitelist::privileged()).await.unwrap();

    assert_eq!(outcome.reason, StopReason::Cancelled(CancelReason::Timeout));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn cancel_without_process_group_still_stops_the_child() {
    let command = shell_command("sleep 5");
    let runner = CommandRunner::new(command, RunOptions::new().use_process_group(false));
    let handle = runner.cancel_handle();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        handle.cancel(CancelReason::UserRequested).await.unwrap();
    });

    let outcome = runner.run(&Whitelist::privileged()).await.unwrap();
    canceller.await.unwrap();

    assert_eq!(
        outcome.reason,
        StopReason::Cancelled(CancelReason::UserRequested)
    );
}

#[cfg(unix)]
#[tokio::test]
async fn cancelled_child_reports_the_kill_signal() {
    let command = shell_command("sleep 5");
    let runner = CommandRunner::new(command, RunOptions::new());
    let handle = runner.cancel_handle();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        handle.cancel(CancelReason::Shutdown).await.unwrap();
    });

    let outcome = runner.run(&Whitelist::privileged()).await.unwrap();
    canceller.await.unwrap();

    // SIGKILL
    assert_eq!(outcome.signal, Some(9));
}

#[tokio::test]
async fn cancel_after_completion_reports_channel_error() {
    let command = shell_command("echo done");
    let runner = CommandRunner::new(command, RunOptions::new());
    let handle = runner.cancel_handle();

    runner.run(&Whitelist::privileged()).await.unwrap();

    let err = handle.cancel(CancelReason::Shutdown).await.unwrap_err();
    assert!(matches!(err, ExecError::Channel(_)));
}

#[tokio::test]
async fn second_cancel_reports_channel_error() {
    let command = shell_command("sleep 5");
    let runner = CommandRunner::new(command, RunOptions::new());
    let first = runner.cancel_handle();
    let second = runner.cancel_handle();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        first.cancel(CancelReason::Shutdown).await.unwrap();
        let err = second.cancel(CancelReason::Shutdown).await.unwrap_err();
        assert!(matches!(err, ExecError::Channel(_)));
    });

    let outcome = runner.run(&Whitelist::privileged()).await.unwrap();
    canceller.await.unwrap();

    assert!(outcome.cancelled());
}
