// src/error.rs
//! Crate-wide error taxonomy
//!
//! Every variant here corresponds to one of the error kinds enumerated in
//! the resolver/build design: resolution failures carry enough structured
//! data for a caller (or a test) to match on the conflicting packages and
//! constraints without parsing a message string.

use std::path::PathBuf;
use thiserror::Error;

use crate::version::Constraint;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed recipe source.
    #[error("{file}:{line}: {message}")]
    RecipeParse {
        file: PathBuf,
        line: u32,
        message: String,
    },

    /// A required package name has no candidate in any supplier or cache.
    #[error("package not found: {name} (requested by {requested_by:?})")]
    PackageNotFound {
        name: String,
        requested_by: Vec<String>,
    },

    /// Candidates exist but none satisfy the effective constraint.
    #[error("no version of {name} satisfies {constraint} (have: {observed:?})")]
    NoCompatibleVersion {
        name: String,
        constraint: Constraint,
        observed: Vec<String>,
    },

    /// Two or more requesters impose constraints with an empty intersection.
    #[error("conflict on {package}: {requesters:?} require {constraints:?}")]
    Conflict {
        package: String,
        requesters: Vec<String>,
        constraints: Vec<Constraint>,
    },

    /// A link-time (or non-path dependency) cycle was detected.
    #[error("dependency cycle: {}", .edges.join(" -> "))]
    Cycle { edges: Vec<String> },

    /// The invoking dub or selected compiler does not meet `toolchainRequirements`.
    #[error("toolchain requirement not met: {requirement} (have {actual})")]
    ToolchainRequirement { requirement: String, actual: String },

    /// The compiler driver exited non-zero while compiling.
    #[error("compile failed for {target} (exit {exit_code:?}): {stderr}")]
    Compile {
        target: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The linker exited non-zero.
    #[error("link failed for {target} (exit {exit_code:?}): {stderr}")]
    Link {
        target: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Filesystem error wrapping the underlying `io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to acquire a file lock (fetch cache / build dir / selection file).
    #[error("failed to acquire lock on {path:?}: {reason}")]
    Lock { path: PathBuf, reason: String },

    /// The operation was cancelled via a cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// A per-target compile/link timeout elapsed.
    ///
    /// `possibly_oom` is set when the child exited with signal 9, which on
    /// most platforms is either an external kill or the OOM killer.
    #[error("timeout after {elapsed_ms}ms building {target}")]
    Timeout {
        target: String,
        elapsed_ms: u64,
        possibly_oom: bool,
    },

    /// Recipe/selection (de)serialization error from an injected format backend.
    #[error("serialization error: {0}")]
    Serialization(String),
}
