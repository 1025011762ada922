// src/version/mod.rs

//! Version and constraint algebra for package dependencies.
//!
//! A [`VersionId`] identifies one concrete instance of a package: a released
//! SemVer triplet, a named branch pointer, or a local path. A [`Constraint`]
//! is the heterogeneous language the resolver intersects while walking the
//! dependency graph: intervals over release versions, exact versions,
//! branch-name matches, path matches, "any", and the absorbing "none".
//!
//! Release ordering follows SemVer 2.0.0: build metadata is ignored for
//! ordering (but kept for display), and a release compares greater than any
//! prerelease sharing its numeric triplet.

mod constraint;
mod id;

pub use constraint::{Bound, Constraint, Interval, MergeMode};
pub use id::VersionId;
