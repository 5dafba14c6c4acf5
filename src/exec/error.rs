use std::io;

use thiserror::Error;

use crate::exec::authorize::AuthError;
use crate::exec::command::StreamSource;
#[cfg(feature = "process-group")]
use crate::exec::process_group::ProcessGroupError;

/// Errors surfaced by the execution engine and the payload boundary.
///
/// Parse failures have their own type
/// ([`ParseError`](crate::exec::parse::ParseError)) because they belong to
/// the submission side; everything that can go wrong between a decoded
/// payload and a completed run lands here.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The wire record failed to deserialize
    #[error("malformed command payload: {0}")]
    Payload(String),

    /// The decoded command violates the data model
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// The authorization gate rejected the executable name
    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    /// A redirect target could not be opened before spawning
    #[error("failed to open redirect file `{path}`: {source}")]
    RedirectOpen {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The child process could not be started
    #[error("failed to spawn `{name}`: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Process group creation or assignment failed
    #[cfg(feature = "process-group")]
    #[error(transparent)]
    ProcessGroup(#[from] ProcessGroupError),

    /// Writing a captured chunk to one of its destinations failed
    #[error("failed writing {stream} chunk to destination: {source}")]
    SinkWrite {
        stream: StreamSource,
        #[source]
        source: io::Error,
    },

    /// The child's pipes or exit status could not be collected
    #[error("process runtime error: {0}")]
    Runtime(String),

    /// The child was killed by a signal the engine did not send
    #[error("child process killed by signal {0:?}")]
    Signaled(Option<i32>),

    /// Cancel channel failure
    #[error("cancel channel error: {0}")]
    Channel(String),
}
