//! Error taxonomy for the crawl core (§7 of the spec).
//!
//! `Spawn` and `Config` are fatal at startup. `Eval` and `Parse` are local to
//! one node (or one Finder trace line) and are reported on the status
//! channel rather than propagated. `Io` on the sink is fatal.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with code {code:?} for {attribute_path:?}")]
    Eval {
        program: String,
        attribute_path: Option<String>,
        code: Option<i32>,
        stderr_tail: String,
    },

    #[error("failed to parse {what}: {detail} (input: {input:?})")]
    Parse {
        what: &'static str,
        detail: String,
        input: String,
    },

    #[error("sink io error writing to {path:?}: {source}")]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// The captured stderr tail for an `Eval` error, if any. Used by callers
    /// (the status channel, top-level diagnostics) that want the detail
    /// without it being baked into `Display`.
    pub fn stderr_tail(&self) -> Option<&str> {
        match self {
            Error::Eval { stderr_tail, .. } if !stderr_tail.is_empty() => Some(stderr_tail),
            _ => None,
        }
    }
}

/// Coarse classification reported on the status channel for a failed node.
/// Distinct from `Error` because the channel carries a cheap, `Clone`,
/// `'static` summary rather than the full error (which may embed captured
/// stderr text).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Spawn,
    Eval,
    Parse,
    Io,
    Config,
}

impl From<&Error> for FailureKind {
    fn from(e: &Error) -> Self {
        match e {
            Error::Spawn { .. } => FailureKind::Spawn,
            Error::Eval { .. } => FailureKind::Eval,
            Error::Parse { .. } => FailureKind::Parse,
            Error::Io { .. } => FailureKind::Io,
            Error::Config(_) => FailureKind::Config,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureKind::Spawn => "spawn",
            FailureKind::Eval => "eval",
            FailureKind::Parse => "parse",
            FailureKind::Io => "io",
            FailureKind::Config => "config",
        };
        f.write_str(s)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
