//! Command parsing, authorization and execution.

pub mod authorize;
pub mod command;
pub mod error;
pub mod options;
pub mod outcome;
pub mod parse;

#[cfg(feature = "process-group")]
pub mod process_group;
#[cfg(feature = "tokio")]
pub mod runner;
