//! # execmux
//!
//! A Rust library for running queued shell-like commands: redirect-aware
//! argument parsing, whitelist authorization and multiplexed capture of
//! process output.
//!
//! ## Features
//!
//! - **Redirect Parsing**: `>`, `1>` and `2>` tokens (spaced or glued) come
//!   out of the argument list as file targets, with descriptive errors for
//!   everything the grammar rejects
//! - **Authorization Gate**: commands pass a whitelist or custom gate before
//!   anything is spawned
//! - **Multiplexed Capture**: stdout and stderr are chunked line-by-line
//!   (carriage returns included, for progress bars) and fanned out to
//!   redirect files, the console and custom sinks, flushed per chunk
//! - **Hard Cancellation**: cancelling a run kills the child's whole process
//!   group (Job Object on Windows)
//! - **Queue Payloads**: commands serialize to a compact JSON record for
//!   transport through task queues
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use execmux::exec::authorize::Whitelist;
//! use execmux::exec::options::RunOptions;
//! use execmux::exec::parse::parse_command;
//! use execmux::exec::runner::CommandRunner;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Redirect tokens are extracted from the argument list.
//!     let command = parse_command("du", ["-sh", "/var", ">/tmp/usage.txt"])?;
//!
//!     let options = RunOptions::new()
//!         .allow_file_redirect(true)
//!         .timeout_ms(30_000);
//!     let runner = CommandRunner::new(command, options);
//!
//!     let outcome = runner.run(&Whitelist::new(["du", "df"])).await?;
//!     println!("exit code: {:?}", outcome.exit_code);
//!     Ok(())
//! }
//! ```
//!
//! ## Cancelling a Run
//!
//! ```rust,no_run
//! use execmux::exec::authorize::Whitelist;
//! use execmux::exec::command::ExecCommand;
//! use execmux::exec::options::RunOptions;
//! use execmux::exec::outcome::CancelReason;
//! use execmux::exec::runner::CommandRunner;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let command = ExecCommand::new("sleep").args(["60"]);
//! let runner = CommandRunner::new(command, RunOptions::new());
//! let handle = runner.cancel_handle();
//!
//! tokio::spawn(async move {
//!     // Kills the whole process group.
//!     handle.cancel(CancelReason::Shutdown).await
//! });
//!
//! let outcome = runner.run(&Whitelist::privileged()).await?;
//! assert!(outcome.cancelled());
//! # Ok(())
//! # }
//! ```
//!
//! ## Optional Features
//!
//! - `tokio` *(default)*: the execution engine; without it only parsing,
//!   authorization and the payload codec are available
//! - `process-group` *(default)*: process-tree cancellation via Unix process
//!   groups / Windows Job Objects
//! - `tracing`: structured logging integration

pub mod exec;
