// src/interfaces/mod.rs

//! External interfaces (C10): `PackageSupplier`, `Compiler`, `FileSystem`,
//! `Clock`. Every suspension point that can block indefinitely — network,
//! disk, subprocess — crosses one of these traits, so the core itself never
//! talks to a socket, a compiler binary, or a wall clock directly. This is
//! what keeps the resolver and build orchestrator deterministic and
//! testable without a real registry or toolchain.

mod clock;
mod compiler;
mod filesystem;
#[cfg(feature = "registry-http")]
mod http_supplier;
mod package_supplier;

pub use clock::{Clock, SystemClock};
pub use compiler::{
    BuildOptions, BuildPlatform, Compiler, InvocationOutput, OPT_COVERAGE, OPT_DEBUG_INFO,
    OPT_NO_BOUNDS_CHECK, OPT_OPTIMIZE, OPT_UNITTESTS, OPT_WARNINGS_AS_ERRORS,
};
pub use filesystem::{FileSystem, StdFileSystem};
#[cfg(feature = "registry-http")]
pub use http_supplier::HttpPackageSupplier;
pub use package_supplier::{extract_archive, PackageSupplier};

/// In-memory fakes for `PackageSupplier`/`Compiler`/`FileSystem`/`Clock`,
/// used by this crate's own unit/integration tests and available to
/// embedders exercising their own resolver/build scenarios without a real
/// registry or toolchain.
pub mod testing;
