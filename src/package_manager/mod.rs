// src/package_manager/mod.rs

//! The package manager (C3): a catalog of package instances drawn from
//! four disjoint sources, searched in priority order:
//!
//! 1. in-process overrides (`add_override`)
//! 2. path-based packages registered by the user (`add_local`)
//! 3. the user-local fetched cache
//! 4. the system-wide fetched cache
//!
//! Recipes are parsed on demand and memoized until a `fetch`/override call
//! invalidates the catalog (`spec.md` §3 "Lifecycles").

mod instance;
mod lock;

pub use instance::{fetched_package_dir, PackageInstance};
pub use lock::PackageLock;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::interfaces::PackageSupplier;
use crate::recipe::{parse_recipe_json, parse_recipe_sdl, PackageName, Recipe};
use crate::version::{Constraint, VersionId};

/// A user-supplied redirection from a declared dependency to a concrete
/// replacement (exact version or local path).
#[derive(Debug, Clone)]
pub struct Override {
    pub name: PackageName,
    pub matches: Constraint,
    pub replacement: VersionId,
    pub replacement_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SourceKind {
    Override,
    Path,
    UserCache,
    SystemCache,
}

pub struct PackageManager {
    overrides: Vec<Override>,
    path_packages: HashMap<PackageName, PathBuf>,
    user_cache_root: PathBuf,
    system_cache_root: PathBuf,
    recipe_cache: Mutex<HashMap<(PackageName, String), Recipe>>,
}

impl PackageManager {
    pub fn new(user_cache_root: PathBuf, system_cache_root: PathBuf) -> Self {
        PackageManager {
            overrides: Vec::new(),
            path_packages: HashMap::new(),
            user_cache_root,
            system_cache_root,
            recipe_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn add_override(&mut self, ovr: Override) {
        self.overrides.push(ovr);
        self.invalidate();
    }

    pub fn add_local(&mut self, name: PackageName, path: PathBuf) {
        self.path_packages.insert(name, path);
        self.invalidate();
    }

    pub fn remove_local(&mut self, name: &PackageName) {
        self.path_packages.remove(name);
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.recipe_cache.get_mut().unwrap().clear();
    }

    /// Look up an override applicable to `name` under `requested`; per
    /// §4.4 an override short-circuits the effective constraint to its
    /// replacement pointer.
    pub fn override_for(&self, name: &PackageName, requested: &Constraint) -> Option<&Override> {
        self.overrides
            .iter()
            .find(|o| &o.name == name && o.matches.intersect(requested) != Constraint::None)
    }

    pub fn path_override(&self, name: &PackageName) -> Option<&Path> {
        self.path_packages.get(name).map(|p| p.as_path())
    }

    /// Versions of `name` visible across the fetched caches (overrides and
    /// path packages are not "versions" in the release sense; they are
    /// resolved directly by `get_package`).
    pub fn find_versions(&self, name: &PackageName) -> Result<Vec<VersionId>> {
        let mut versions = Vec::new();
        for (root, _) in [
            (&self.user_cache_root, SourceKind::UserCache),
            (&self.system_cache_root, SourceKind::SystemCache),
        ] {
            let dir = root.join(&name.0);
            if !dir.is_dir() {
                continue;
            }
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                if !entry.file_type()?.is_dir() {
                    continue;
                }
                let file_name = entry.file_name();
                let raw = file_name.to_string_lossy();
                if let Ok(v) = semver::Version::parse(&raw) {
                    versions.push(VersionId::Release(v));
                } else if let Some(branch) = raw.strip_prefix('~') {
                    versions.push(VersionId::Branch(branch.to_string()));
                }
            }
        }
        versions.sort_by(|a, b| match (a, b) {
            (VersionId::Release(x), VersionId::Release(y)) => x.cmp(y),
            _ => std::cmp::Ordering::Equal,
        });
        versions.dedup();
        Ok(versions)
    }

    /// Load the recipe for `(name, version)`, searching sources in
    /// priority order, memoizing the result.
    pub fn get_package(&self, name: &PackageName, version: &VersionId) -> Result<Recipe> {
        let key = (name.clone(), version.to_string());
        if let Some(cached) = self.recipe_cache.lock().unwrap().get(&key) {
            return Ok(cached.clone());
        }

        let dir = self.locate(name, version)?;
        let recipe = self.load_recipe_from_dir(&dir)?;
        self.recipe_cache.lock().unwrap().insert(key, recipe.clone());
        Ok(recipe)
    }

    /// Resolve the on-disk directory backing `(name, version)` without
    /// parsing its recipe, honoring source priority.
    pub fn locate(&self, name: &PackageName, version: &VersionId) -> Result<PathBuf> {
        if let VersionId::Path(p) = version {
            return Ok(p.clone());
        }
        if let Some(p) = self.path_packages.get(name) {
            return Ok(p.clone());
        }
        for root in [&self.user_cache_root, &self.system_cache_root] {
            let dir = fetched_package_dir(root, name, version);
            if dir.is_dir() {
                return Ok(dir);
            }
        }
        Err(Error::PackageNotFound {
            name: name.0.clone(),
            requested_by: Vec::new(),
        })
    }

    /// Parse whichever recipe file is present at `dir`. Exposed so callers
    /// that already know a package's directory (e.g. the project builder
    /// resolving a path-based subpackage) can load it without going
    /// through `locate`'s name/version addressing.
    pub fn load_recipe_at(&self, dir: &Path) -> Result<Recipe> {
        self.load_recipe_from_dir(dir)
    }

    fn load_recipe_from_dir(&self, dir: &Path) -> Result<Recipe> {
        for (file_name, parser) in [
            ("dub.json", parse_recipe_json as fn(&str, &Path) -> Result<Recipe>),
            ("dub.sdl", parse_recipe_sdl),
        ] {
            let path = dir.join(file_name);
            if path.is_file() {
                let source = std::fs::read_to_string(&path)?;
                return parser(&source, &path);
            }
        }
        Err(Error::PackageNotFound {
            name: dir.display().to_string(),
            requested_by: Vec::new(),
        })
    }

    /// Fetch `name@version` from `supplier` into `location`'s cache root,
    /// under an exclusive per-(name,version) lock so concurrent `dub`
    /// processes cannot corrupt a half-written package directory.
    pub fn fetch(
        &mut self,
        name: &PackageName,
        version: &VersionId,
        supplier: &dyn PackageSupplier,
        location: FetchLocation,
    ) -> Result<PathBuf> {
        let root = match location {
            FetchLocation::User => &self.user_cache_root,
            FetchLocation::System => &self.system_cache_root,
        };
        let dest = fetched_package_dir(root, name, version);
        std::fs::create_dir_all(dest.parent().unwrap())?;

        let version_dir = dest.parent().unwrap();
        let lock_path = version_dir.with_file_name(format!("{}.lock", version.to_string()));
        let _lock = PackageLock::acquire_exclusive(&lock_path)?;

        if dest.is_dir() {
            self.invalidate();
            return Ok(dest);
        }

        let archive = supplier.fetch_archive(&name.0, version)?;
        let tmp = tempfile::Builder::new()
            .prefix(".dub-fetch-")
            .tempdir_in(root)?;
        crate::interfaces::extract_archive(&archive, tmp.path())?;

        std::fs::create_dir_all(&dest)?;
        for entry in std::fs::read_dir(tmp.path())? {
            let entry = entry?;
            let target = dest.join(entry.file_name());
            std::fs::rename(entry.path(), target)?;
        }
        self.invalidate();
        Ok(dest)
    }

    pub fn remove(&mut self, name: &PackageName, version: &VersionId, location: FetchLocation) -> Result<()> {
        let root = match location {
            FetchLocation::User => &self.user_cache_root,
            FetchLocation::System => &self.system_cache_root,
        };
        let dest = fetched_package_dir(root, name, version);
        if dest.is_dir() {
            std::fs::remove_dir_all(&dest)?;
        }
        self.invalidate();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchLocation {
    User,
    System,
}

#[cfg(test)]
mod tests;
