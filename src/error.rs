//! Error taxonomy (§7) and the single formatting seam for user-visible diagnostics.
//!
//! Mirrors the teacher's `error::print_error`: one function decides how a
//! failure reaches the user, so callers never format their own "fd: ..."-style
//! messages. Color/terminal rendering is out of scope (§1), so this module
//! only ever writes plain text to stderr.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// The kinds of the spec's error taxonomy (§7). Not every kind carries a
/// `std::io::Error`; parse/configuration/invariant failures are purely
/// descriptive.
#[derive(Debug)]
pub enum RfindError {
    /// Malformed argument; fatal for the run.
    Parse { message: String, argv_span: Option<(usize, usize)> },
    /// Platform does not support a requested predicate.
    Configuration { message: String },
    /// A syscall failed while enumerating or testing one file.
    PerFile { path: PathBuf, source: io::Error },
    /// A non-existence-class failure at depth > 0.
    Race { path: PathBuf, source: io::Error },
    /// I/O error writing to an action's sink.
    SinkIo { target: String, source: io::Error },
    /// Allocation or fd-limit exhaustion.
    ResourceExhaustion { message: String },
    /// The core's own invariant was violated; indicates a bug in the core.
    Invariant { message: String },
}

impl fmt::Display for RfindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RfindError::Parse { message, .. } => write!(f, "{message}"),
            RfindError::Configuration { message } => write!(f, "{message}"),
            RfindError::PerFile { path, source } => {
                write!(f, "'{}': {source}", path.display())
            }
            RfindError::Race { path, source } => {
                write!(f, "'{}': {source}", path.display())
            }
            RfindError::SinkIo { target, source } => {
                write!(f, "write error on '{target}': {source}")
            }
            RfindError::ResourceExhaustion { message } => write!(f, "{message}"),
            RfindError::Invariant { message } => write!(f, "internal error: {message}"),
        }
    }
}

impl std::error::Error for RfindError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RfindError::PerFile { source, .. }
            | RfindError::Race { source, .. }
            | RfindError::SinkIo { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl RfindError {
    /// A "no longer exists" class failure, i.e. the class that `ignore_races`
    /// suppresses when it occurs below the roots (§4.E, §7).
    pub fn is_race_class(&self) -> bool {
        matches!(self, RfindError::Race { .. })
            || matches!(
                self,
                RfindError::PerFile { source, .. }
                    if source.kind() == io::ErrorKind::NotFound
            )
    }
}

/// Print a fatal or per-file error to stderr, in the teacher's `fd: <msg>` style.
pub fn print_error(message: impl fmt::Display) {
    eprintln!("rfind: {message}");
}

/// Print a non-fatal warning (optimizer diagnostics, deprecated flag notices).
pub fn print_warning(message: impl fmt::Display) {
    eprintln!("rfind: warning: {message}");
}
