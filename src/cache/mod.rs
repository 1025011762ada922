// src/cache/mod.rs

//! The build cache (C7): content-addressed storage of per-target outputs
//! keyed by build-id, under each target's owning package directory
//! (`spec.md` §4.7):
//!
//! ```text
//! <package-dir>/.dub/build/<build-id>/
//!     artifact          the compiled output
//!     manifest.json     the list of inputs consumed (diagnostic only —
//!                       the build-id already subsumes them)
//! ```
//!
//! Write protocol: compile into a temporary sibling directory, then rename
//! atomically into place on success; remove the partial directory on
//! failure. Concurrent builders racing on the same build-id take an
//! exclusive file lock on the build directory; the loser observes the
//! completed artifact once the lock is released.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::package_manager::PackageLock;
use crate::target::BuildId;

const BUILD_DIR: &str = ".dub/build";
const MANIFEST_FILE: &str = "manifest.json";

/// The inputs a cached build consumed, recorded alongside the artifact for
/// diagnostics (`dub describe`-style introspection, cache debugging). Not
/// consulted for cache invalidation: the build-id already subsumes every
/// field here (`spec.md` §4.7 "Invalidation").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildManifest {
    pub package: String,
    pub build_type: String,
    pub artifact_file_name: String,
    pub inputs: Vec<String>,
}

/// A handle onto one package's `.dub/build/` directory.
pub struct BuildCache {
    package_dir: PathBuf,
}

impl BuildCache {
    pub fn new(package_dir: impl Into<PathBuf>) -> Self {
        BuildCache {
            package_dir: package_dir.into(),
        }
    }

    fn build_dir(&self, id: &BuildId) -> PathBuf {
        self.package_dir.join(BUILD_DIR).join(id.to_string())
    }

    /// A hit iff both the manifest and the artifact file it names are
    /// present on disk (`spec.md` §4.7).
    pub fn lookup(&self, id: &BuildId) -> Result<Option<PathBuf>> {
        let dir = self.build_dir(id);
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Ok(None);
        }
        let manifest: BuildManifest =
            serde_json::from_str(&std::fs::read_to_string(&manifest_path)?)
                .map_err(|e| crate::error::Error::Serialization(e.to_string()))?;
        let artifact = dir.join(&manifest.artifact_file_name);
        if !artifact.is_file() {
            return Ok(None);
        }
        Ok(Some(artifact))
    }

    /// Run `compile` (which must place its artifact at
    /// `tmp_dir/manifest.artifact_file_name`) inside a fresh temporary
    /// sibling directory, then atomically install it into the cache on
    /// success. On failure the temporary directory is removed and nothing
    /// is left under `.dub/build/`.
    ///
    /// Holds an exclusive lock on the build directory for the duration, so
    /// a second builder racing on the same `id` blocks until this one
    /// finishes and then observes the installed artifact via `lookup`
    /// instead of recompiling (`spec.md` §4.7/§5).
    pub fn install<F>(&self, id: &BuildId, manifest: BuildManifest, compile: F) -> Result<PathBuf>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        let dir = self.build_dir(id);
        std::fs::create_dir_all(dir.parent().unwrap())?;
        let lock_path = dir.with_extension("lock");
        let _lock = PackageLock::acquire_exclusive(&lock_path)?;

        if let Some(artifact) = self.lookup(id)? {
            return Ok(artifact);
        }

        let tmp = tempfile::Builder::new()
            .prefix(".dub-build-")
            .tempdir_in(dir.parent().unwrap())?;

        if let Err(e) = compile(tmp.path()) {
            return Err(e);
        }

        std::fs::write(
            tmp.path().join(MANIFEST_FILE),
            serde_json::to_vec_pretty(&manifest).map_err(|e| crate::error::Error::Serialization(e.to_string()))?,
        )?;

        if dir.is_dir() {
            std::fs::remove_dir_all(&dir)?;
        }
        std::fs::create_dir_all(&dir)?;
        for entry in std::fs::read_dir(tmp.path())? {
            let entry = entry?;
            std::fs::rename(entry.path(), dir.join(entry.file_name()))?;
        }

        Ok(dir.join(&manifest.artifact_file_name))
    }

    /// Remove every build directory under this package's cache that is not
    /// in `keep`. A separate maintenance operation from normal lookups
    /// (`spec.md` §4.7 "garbage collection is a separate maintenance
    /// operation"); returns the number of directories removed.
    pub fn gc(&self, keep: &std::collections::HashSet<BuildId>) -> Result<usize> {
        let root = self.package_dir.join(BUILD_DIR);
        if !root.is_dir() {
            return Ok(0);
        }
        let keep_names: std::collections::HashSet<String> = keep.iter().map(|id| id.to_string()).collect();
        let mut removed = 0;
        for entry in std::fs::read_dir(&root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if !keep_names.contains(&name) {
                std::fs::remove_dir_all(entry.path())?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests;
