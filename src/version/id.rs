// src/version/id.rs

//! Package version identity: a release, a branch pointer, or a local path.

use std::fmt;
use std::path::{Path, PathBuf};

use semver::Version;

/// One concrete instance a package name can resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionId {
    /// A SemVer 2.0.0 release, ordered by the SemVer rules.
    Release(Version),
    /// A branch pointer, e.g. `~main`. Unordered relative to releases and
    /// to other branches; two branch pointers are equal only by name.
    Branch(String),
    /// A local directory. Has no ordering; compares equal only to itself
    /// (by normalized path).
    Path(PathBuf),
}

impl VersionId {
    pub fn release(v: Version) -> Self {
        VersionId::Release(v)
    }

    pub fn branch(name: impl Into<String>) -> Self {
        VersionId::Branch(name.into())
    }

    pub fn path(p: impl AsRef<Path>) -> Self {
        VersionId::Path(normalize(p.as_ref()))
    }

    pub fn as_release(&self) -> Option<&Version> {
        match self {
            VersionId::Release(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_prerelease(&self) -> bool {
        matches!(self, VersionId::Release(v) if !v.pre.is_empty())
    }
}

/// Normalize a path for equality/hashing without touching the filesystem
/// (the path need not exist yet when a dependency is first declared).
pub(crate) fn normalize(p: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in p.components() {
        use std::path::Component::*;
        match component {
            CurDir => {}
            ParentDir => {
                if !matches!(out.components().next_back(), Some(ParentDir) | None) {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionId::Release(v) => write!(f, "{v}"),
            VersionId::Branch(name) => write!(f, "~{name}"),
            VersionId::Path(p) => write!(f, "{}", p.display()),
        }
    }
}
