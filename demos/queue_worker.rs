//! The full path a queue worker walks: parse a submitted command line with
//! its redirect tokens, ship it as a payload, decode it on the worker side,
//! consult the whitelist and run it.
//!
//! ```bash
//! RUST_LOG=debug cargo run --example queue_worker --features tracing
//! ```

use execmux::exec::authorize::Whitelist;
use execmux::exec::command::PAYLOAD_KIND;
use execmux::exec::options::RunOptions;
use execmux::exec::parse::parse_command;
use execmux::exec::runner::CommandRunner;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Submit side: shell-like input with a glued redirect.
    #[cfg(unix)]
    let (name, raw_args) = ("ls", vec!["-la", ">/tmp/listing.txt"]);
    #[cfg(windows)]
    let (name, raw_args) = ("cmd", vec!["/C", "dir", ">listing.txt"]);

    let command = parse_command(name, raw_args)?;
    let payload = command.to_payload()?;
    println!(
        "enqueued {} task: {}",
        PAYLOAD_KIND,
        String::from_utf8_lossy(&payload)
    );

    // Worker side: decode, authorize, execute.
    let options = RunOptions::new()
        .echo(true)
        .allow_file_redirect(true)
        .timeout_ms(10_000);
    let runner = CommandRunner::from_payload(&payload, options)?;

    let gate = Whitelist::new(["ls", "cmd", "du", "df"]);
    let outcome = runner.run(&gate).await?;

    println!(
        "exit code: {:?}, reason: {:?}",
        outcome.exit_code, outcome.reason
    );
    Ok(())
}
