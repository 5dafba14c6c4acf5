use crate::exec::authorize::Whitelist;
use crate::exec::error::ExecError;
use crate::exec::options::RunOptions;
use crate::exec::parse::parse_command;
use crate::exec::runner::CommandRunner;
use crate::exec::runner::integration_tests::helper::{shell_command, shell_parts};

#[tokio::test]
async fn stdout_redirect_writes_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");

    let command = shell_command("echo redirected").stdout_file(path.to_str().unwrap());
    let runner = CommandRunner::new(command, RunOptions::new().allow_file_redirect(true));

    let outcome = runner.run(&Whitelist::privileged()).await.unwrap();

    assert!(outcome.success());
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.trim_end(), "redirected");
}

#[tokio::test]
async fn both_streams_redirect_to_separate_files() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("out.txt");
    let err_path = dir.path().join("err.txt");

    #[cfg(unix)]
    let script = "echo out; echo err 1>&2";
    #[cfg(windows)]
    let script = "echo out; [Console]::Error.WriteLine('err')";

    let command = shell_command(script)
        .stdout_file(out_path.to_str().unwrap())
        .stderr_file(err_path.to_str().unwrap());
    let runner = CommandRunner::new(command, RunOptions::new().allow_file_redirect(true));

    let outcome = runner.run(&Whitelist::privileged()).await.unwrap();

    assert!(outcome.success());
    assert_eq!(
        std::fs::read_to_string(&out_path).unwrap().trim_end(),
        "out"
    );
    assert_eq!(
        std::fs::read_to_string(&err_path).unwrap().trim_end(),
        "err"
    );
}

#[tokio::test]
async fn redirect_requires_permission() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("never.txt");

    let command = shell_command("echo hidden").stdout_file(path.to_str().unwrap());
    // allow_file_redirect stays off: the target must not even be created.
    let runner = CommandRunner::new(command, RunOptions::new());

    let outcome = runner.run(&Whitelist::privileged()).await.unwrap();

    assert!(outcome.success());
    assert!(!path.exists());
}

#[tokio::test]
async fn redirect_truncates_previous_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");
    std::fs::write(&path, "stale contents that are longer than the fresh ones").unwrap();

    let command = shell_command("echo fresh").stdout_file(path.to_str().unwrap());
    let runner = CommandRunner::new(command, RunOptions::new().allow_file_redirect(true));

    runner.run(&Whitelist::privileged()).await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.trim_end(), "fresh");
}

#[tokio::test]
async fn unopenable_target_fails_before_spawn() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing-dir").join("out.txt");

    let command = shell_command("echo never").stdout_file(path.to_str().unwrap());
    let runner = CommandRunner::new(command, RunOptions::new().allow_file_redirect(true));

    let err = runner.run(&Whitelist::privileged()).await.unwrap_err();
    match err {
        ExecError::RedirectOpen { path: failed, .. } => assert!(failed.contains("missing-dir")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn parsed_redirect_tokens_flow_to_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parsed.txt");

    let (name, mut args) = shell_parts("echo via-parser");
    args.push(">".to_string());
    args.push(path.to_str().unwrap().to_string());

    let command = parse_command(name, args).unwrap();
    let runner = CommandRunner::new(command, RunOptions::new().allow_file_redirect(true));

    let outcome = runner.run(&Whitelist::privileged()).await.unwrap();

    assert!(outcome.success());
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.trim_end(), "via-parser");
}
