// src/lib.rs

//! DUB: the package manager and build driver for a compiled systems
//! language.
//!
//! Given a recipe and a set of package suppliers, DUB resolves one
//! concrete version per transitive dependency ([`resolver`]), expands the
//! result into a runtime package graph ([`project`]), derives an ordered
//! target graph with a cryptographic build-id per target ([`target`]),
//! and drives either a direct compiler invocation or an external build
//! description ([`generator`]) against a content-addressed cache
//! ([`cache`]). The pinned result of a resolve is persisted in a
//! [`selection`] document so an unchanged dependency set never
//! re-resolves.
//!
//! Every suspension point — registry access, compiler invocation,
//! filesystem I/O, wall-clock time — crosses one of the [`interfaces`]
//! traits, so the core itself never talks to a socket, a compiler binary,
//! or a clock directly.

pub mod cache;
pub mod compiler;
pub mod error;
pub mod generator;
pub mod hash;
pub mod interfaces;
pub mod package_manager;
pub mod progress;
pub mod project;
pub mod recipe;
pub mod resolver;
pub mod selection;
pub mod target;
pub mod version;

pub use error::{Error, Result};
pub use progress::{
    CallbackProgress, LogProgress, MultiProgress, ProgressEvent, ProgressStyle, ProgressTracker,
    SilentProgress,
};
pub use recipe::{BuildSettings, Configuration, Dependency, PackageName, Recipe, TargetType};
pub use resolver::{resolve, Resolution, ResolverOptions, UpgradeMode};
pub use selection::Selection;
pub use version::{Constraint, VersionId};
