//! Shell-like redirect parsing for submitted command lines.
//!
//! Arguments are scanned in two passes: a normalization pass rewrites glued
//! redirect forms (`>file`, `1>file`, `2>file`) into the spaced two-token
//! form, then a consuming pass walks the canonical tokens, binds each
//! redirect operator to the token that follows it and collects everything
//! else as plain arguments. Parsing never partially succeeds: any input the
//! grammar does not cover fails with a descriptive [`ParseError`].

use thiserror::Error;

use crate::exec::command::{ExecCommand, StreamSource};

/// Errors produced while parsing redirect syntax out of raw arguments.
///
/// Every variant carries the offending command name and raw argument list so
/// queue submitters get the full rejected input back.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A pipe character appeared in the name or an argument
    #[error("pipe functionality is not available, in `{name}` {args:?}")]
    PipeUnsupported { name: String, args: Vec<String> },

    /// An append redirection (`>>`) was requested
    #[error("append redirection (`>>`) is not supported, in `{name}` {args:?}")]
    AppendUnsupported { name: String, args: Vec<String> },

    /// `>` was glued to something that is not a stream digit
    #[error("unable to parse file redirect in `{name}` {args:?}, add a space before `>`")]
    GluedRedirect { name: String, args: Vec<String> },

    /// An argument mixed `>` characters in a shape the grammar does not cover
    #[error("unable to parse file redirect syntax in `{name}` {args:?}")]
    RedirectSyntax { name: String, args: Vec<String> },

    /// The same stream was redirected twice
    #[error("duplicate {stream} redirect in `{name}` {args:?}")]
    DuplicateRedirect {
        stream: StreamSource,
        name: String,
        args: Vec<String>,
    },

    /// A redirect operator was the last token, with no target after it
    #[error("file redirect without a target file in `{name}` {args:?}")]
    DanglingRedirect { name: String, args: Vec<String> },
}

/// Parse a raw `(name, args)` pair into an [`ExecCommand`].
///
/// Recognized redirect forms are `>`, `1>` and `2>`, either as standalone
/// tokens followed by the target file or glued to the target (`>file`,
/// `1>file`, `2>file`). `>` and `1>` both bind stdout. Arguments of one or
/// two characters are never treated as glued redirects, so tokens like `2`
/// or `-q` pass through untouched. Empty arguments are dropped.
///
/// # Examples
///
/// ```
/// use execmux::exec::parse::parse_command;
///
/// let command = parse_command("ffmpeg", ["-i", "in.mp4", ">/tmp/out.log", "2>", "/tmp/err.log"])
///     .unwrap();
/// assert_eq!(command.args, ["-i", "in.mp4"]);
/// assert_eq!(command.stdout_target(), Some("/tmp/out.log"));
/// assert_eq!(command.stderr_target(), Some("/tmp/err.log"));
/// ```
pub fn parse_command<I, S>(name: impl Into<String>, raw_args: I) -> Result<ExecCommand, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let name = name.into();
    let raw: Vec<String> = raw_args
        .into_iter()
        .map(|arg| arg.as_ref().to_owned())
        .collect();

    if name.contains('>') {
        return Err(ParseError::GluedRedirect { name, args: raw });
    }
    if name.contains('|') {
        return Err(ParseError::PipeUnsupported { name, args: raw });
    }

    let tokens = normalize_args(&name, &raw)?;
    consume_tokens(name, raw, tokens)
}

/// Normalization pass: rewrite glued redirect forms into spaced tokens.
fn normalize_args(name: &str, raw: &[String]) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::with_capacity(raw.len());
    for arg in raw {
        if arg.contains('|') {
            return Err(ParseError::PipeUnsupported {
                name: name.to_owned(),
                args: raw.to_vec(),
            });
        }
        match arg.len() {
            // Empty arguments carry nothing.
            0 => {}
            // Too short to hold a glued redirect, pass through untouched.
            1 | 2 => tokens.push(arg.clone()),
            _ => {
                let parts: Vec<&str> = arg.split('>').collect();
                match parts.len() {
                    1 => tokens.push(arg.clone()),
                    2 => match parts[0] {
                        "" => {
                            tokens.push(">".to_owned());
                            tokens.push(parts[1].to_owned());
                        }
                        "1" | "2" => {
                            tokens.push(format!("{}>", parts[0]));
                            tokens.push(parts[1].to_owned());
                        }
                        _ => {
                            return Err(ParseError::GluedRedirect {
                                name: name.to_owned(),
                                args: raw.to_vec(),
                            });
                        }
                    },
                    // `a>>b` splits into ["a", "", "b"]; only the pure
                    // append form `>>file` gets as far as the append error.
                    3 if parts[0].is_empty() && parts[1].is_empty() => {
                        tokens.push(">>".to_owned());
                        tokens.push(parts[2].to_owned());
                    }
                    _ => {
                        return Err(ParseError::RedirectSyntax {
                            name: name.to_owned(),
                            args: raw.to_vec(),
                        });
                    }
                }
            }
        }
    }
    Ok(tokens)
}

/// Consuming pass: bind redirect operators to their targets, collect the
/// rest as arguments. `pending` holds an operator waiting for its file.
fn consume_tokens(
    name: String,
    raw: Vec<String>,
    tokens: Vec<String>,
) -> Result<ExecCommand, ParseError> {
    let mut args = Vec::new();
    let mut stdout_file = String::new();
    let mut stderr_file = String::new();
    let mut pending: Option<StreamSource> = None;

    for token in tokens {
        if let Some(stream) = pending.take() {
            match stream {
                StreamSource::Stdout => stdout_file = token,
                StreamSource::Stderr => stderr_file = token,
            }
            continue;
        }
        match token.as_str() {
            "" => {}
            ">" | "1>" => {
                if !stdout_file.is_empty() {
                    return Err(ParseError::DuplicateRedirect {
                        stream: StreamSource::Stdout,
                        name,
                        args: raw,
                    });
                }
                pending = Some(StreamSource::Stdout);
            }
            "2>" => {
                if !stderr_file.is_empty() {
                    return Err(ParseError::DuplicateRedirect {
                        stream: StreamSource::Stderr,
                        name,
                        args: raw,
                    });
                }
                pending = Some(StreamSource::Stderr);
            }
            ">>" => return Err(ParseError::AppendUnsupported { name, args: raw }),
            _ => args.push(token),
        }
    }

    if pending.is_some() {
        return Err(ParseError::DanglingRedirect { name, args: raw });
    }

    Ok(ExecCommand {
        name,
        args,
        stdout_file,
        stderr_file,
    })
}
