use thiserror::Error;

/// Error returned when a command name fails the authorization gate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("`{name}` is not a whitelisted executable, allowed: {allowed:?}")]
pub struct AuthError {
    /// Name of the rejected executable
    pub name: String,
    /// The allowed set at the time of the check, for diagnostics
    pub allowed: Vec<String>,
}

/// Yes/no authorization check consulted before any process is spawned.
///
/// The runner treats the gate as opaque: it only ever passes the executable
/// name and acts on the verdict. Closures with the matching signature
/// implement the trait, so ad-hoc policies do not need a named type.
pub trait CommandGate: Send + Sync {
    /// Decide whether `name` may be executed.
    fn authorize(&self, name: &str) -> Result<(), AuthError>;
}

impl<F> CommandGate for F
where
    F: Fn(&str) -> Result<(), AuthError> + Send + Sync,
{
    fn authorize(&self, name: &str) -> Result<(), AuthError> {
        self(name)
    }
}

/// Exact-name whitelist with a privileged escape hatch.
///
/// # Examples
///
/// ```
/// use execmux::exec::authorize::{CommandGate, Whitelist};
///
/// let gate = Whitelist::new(["ls", "du"]);
/// assert!(gate.authorize("ls").is_ok());
/// assert!(gate.authorize("rm").is_err());
///
/// assert!(Whitelist::privileged().authorize("rm").is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    allowed: Vec<String>,
    privileged: bool,
}

impl Whitelist {
    /// Gate allowing exactly the given executable names.
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Whitelist {
            allowed: allowed.into_iter().map(Into::into).collect(),
            privileged: false,
        }
    }

    /// Gate allowing every executable regardless of the name list.
    pub fn privileged() -> Self {
        Whitelist {
            allowed: Vec::new(),
            privileged: true,
        }
    }

    /// Names this gate allows when it is not privileged.
    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }
}

impl CommandGate for Whitelist {
    fn authorize(&self, name: &str) -> Result<(), AuthError> {
        if self.privileged || self.allowed.iter().any(|allowed| allowed == name) {
            return Ok(());
        }
        Err(AuthError {
            name: name.to_owned(),
            allowed: self.allowed.clone(),
        })
    }
}
