// src/project/mod.rs

//! The project builder (C5): expand a resolved selection into the runtime
//! package graph. For every activated package this picks one configuration
//! (the caller's choice for the root, a dependency's `subConfiguration` pin
//! otherwise, falling back to the first platform-matching configuration in
//! declaration order) and folds dependency-inherited `BuildSettings` bottom
//! up: a consumer's settings are its own configuration's settings plus,
//! for every activated dependency, the import/string-import paths and
//! versions it exposes (and, for a source library specifically, its full
//! settings short of link inputs, since it has no compiled artifact of its
//! own to link against).

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::interfaces::PackageSupplier;
use crate::package_manager::PackageManager;
use crate::recipe::{BuildSettings, Dependency, PackageName, Platform, Recipe, SubpackageRef, TargetType};
use crate::resolver::Resolution;
use crate::version::VersionId;

/// One package as it participates in a built project.
#[derive(Debug, Clone)]
pub struct ProjectPackage {
    pub name: PackageName,
    pub version: VersionId,
    /// The directory `recipe`'s relative source/import paths are resolved
    /// against. Empty for a package whose recipe was only available from a
    /// `PackageSupplier` and has not been fetched to disk yet.
    pub dir: PathBuf,
    pub recipe: Recipe,
    pub configuration: String,
    pub target_type: TargetType,
    /// This package's own configuration settings, before folding in
    /// anything inherited from dependencies.
    pub own_settings: BuildSettings,
    /// `own_settings` plus inherited dependency settings.
    pub settings: BuildSettings,
    /// Direct activated dependencies, keyed the same way as `Project`
    /// (bare name, or `parent:child` for a subpackage reference).
    pub dependencies: Vec<PackageName>,
}

/// The runtime package graph: the root plus every non-root package
/// activated by the resolution it was built from.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: ProjectPackage,
    pub packages: BTreeMap<PackageName, ProjectPackage>,
}

impl Project {
    pub fn package(&self, name: &PackageName) -> Option<&ProjectPackage> {
        if *name == self.root.name {
            Some(&self.root)
        } else {
            self.packages.get(name)
        }
    }

    /// All packages, root included; no particular order is guaranteed
    /// beyond `packages` being name-sorted. Callers needing a
    /// dependency-respecting order should use the target graph builder.
    pub fn all(&self) -> impl Iterator<Item = &ProjectPackage> {
        std::iter::once(&self.root).chain(self.packages.values())
    }
}

pub struct ProjectBuilder<'a> {
    manager: &'a PackageManager,
    suppliers: &'a [Box<dyn PackageSupplier>],
    platform: Platform,
}

impl<'a> ProjectBuilder<'a> {
    pub fn new(manager: &'a PackageManager, suppliers: &'a [Box<dyn PackageSupplier>], platform: Platform) -> Self {
        ProjectBuilder {
            manager,
            suppliers,
            platform,
        }
    }

    /// Build a `Project` from `root` (loaded from `root_dir`) and a
    /// resolution produced by [`crate::resolver::resolve`]. `requested_config`
    /// is the caller's explicit `--config` choice for the root, if any.
    pub fn build(
        &self,
        root: &Recipe,
        root_dir: &Path,
        resolution: &Resolution,
        requested_config: Option<&str>,
    ) -> Result<Project> {
        let mut packages: BTreeMap<PackageName, ProjectPackage> = BTreeMap::new();
        let mut visiting: BTreeSet<PackageName> = BTreeSet::new();

        self.visit(
            root.name.clone(),
            root_dir.to_path_buf(),
            VersionId::path(root_dir),
            root.clone(),
            requested_config,
            resolution,
            &mut packages,
            &mut visiting,
        )?;

        let root_package = packages
            .remove(&root.name)
            .expect("root was just inserted by visit");
        Ok(Project {
            root: root_package,
            packages,
        })
    }

    /// Load, configure, recurse into dependencies, and fold settings for
    /// one package. A no-op if `name` is already present in `packages` or
    /// currently being visited higher up the call stack (the latter can
    /// only happen for the path-based subpackage cycles `spec.md` §4.4
    /// permits; breaking them here keeps this pass total).
    #[allow(clippy::too_many_arguments)]
    fn visit(
        &self,
        name: PackageName,
        dir: PathBuf,
        version: VersionId,
        recipe: Recipe,
        requested_config: Option<&str>,
        resolution: &Resolution,
        packages: &mut BTreeMap<PackageName, ProjectPackage>,
        visiting: &mut BTreeSet<PackageName>,
    ) -> Result<()> {
        if packages.contains_key(&name) || visiting.contains(&name) {
            return Ok(());
        }
        visiting.insert(name.clone());

        let configuration = recipe
            .select_configuration(&self.platform, requested_config)
            .ok_or_else(|| Error::PackageNotFound {
                name: name.0.clone(),
                requested_by: Vec::new(),
            })?;
        let configuration_name = configuration.name.clone();
        let target_type = configuration.target_type;
        let mut own_settings = configuration.merged_settings(&self.platform);
        own_settings.expand_source_globs(&dir);

        let mut dependencies = Vec::new();
        for dep in &recipe.dependencies {
            if let Some(target) = self.resolve_dependency_target(
                &name,
                &dir,
                &recipe,
                dep,
                resolution,
                packages,
                visiting,
            )? {
                dependencies.push(target);
            }
        }

        let mut settings = own_settings.clone();
        for dep_name in &dependencies {
            if let Some(dep_pkg) = packages.get(dep_name) {
                let inherited = if dep_pkg.target_type == TargetType::SourceLibrary {
                    dep_pkg.settings.inherited_for_source_lib_consumer()
                } else {
                    dep_pkg.settings.inherited_for_static_lib_consumer()
                };
                settings.merge(&inherited, false);
            }
        }

        packages.insert(
            name.clone(),
            ProjectPackage {
                name,
                version,
                dir,
                recipe,
                configuration: configuration_name,
                target_type,
                own_settings,
                settings,
                dependencies,
            },
        );
        Ok(())
    }

    /// Resolve one dependency declaration to the target it names (if
    /// activated), recursing into `visit` for it first so it is already in
    /// `packages` by the time this returns.
    #[allow(clippy::too_many_arguments)]
    fn resolve_dependency_target(
        &self,
        requester: &PackageName,
        requester_dir: &Path,
        requester_recipe: &Recipe,
        dep: &Dependency,
        resolution: &Resolution,
        packages: &mut BTreeMap<PackageName, ProjectPackage>,
        visiting: &mut BTreeSet<PackageName>,
    ) -> Result<Option<PackageName>> {
        // A bare `:child` addresses the enclosing recipe's own subpackage;
        // the resolver never tracks these, so activation is decided here
        // using the same "unconditional unless optional and not defaulted"
        // rule it applies to root defaults (`DESIGN.md`: self-reference
        // subpackages have only one possible requester, so rule (b) of
        // `spec.md` §4.4 never applies to them).
        if let Some(child) = dep.name.0.strip_prefix(':') {
            if dep.optional && !dep.default {
                return Ok(None);
            }
            let (sub_recipe, sub_dir) = self
                .find_subpackage(requester_recipe, requester_dir, child)?
                .ok_or_else(|| Error::PackageNotFound {
                    name: dep.name.0.clone(),
                    requested_by: vec![requester.0.clone()],
                })?;
            let full_name = PackageName::new(format!("{}:{child}", requester.0));
            let version = resolution
                .version_of(requester)
                .cloned()
                .unwrap_or_else(|| VersionId::path(requester_dir));
            self.visit(
                full_name.clone(),
                sub_dir,
                version,
                sub_recipe,
                dep.sub_configuration.as_deref(),
                resolution,
                packages,
                visiting,
            )?;
            return Ok(Some(full_name));
        }

        let (parent, child) = dep.name.split_subpackage();
        if let Some(parent_str) = parent {
            let parent_name = PackageName::new(parent_str.to_string());
            let parent_version = match resolution.version_of(&parent_name) {
                Some(v) => v.clone(),
                None if dep.optional => return Ok(None),
                None => {
                    return Err(Error::PackageNotFound {
                        name: parent_str.to_string(),
                        requested_by: vec![requester.0.clone()],
                    })
                }
            };
            let (parent_recipe, parent_dir) = self.load_recipe_and_dir(&parent_name, &parent_version)?;
            let (sub_recipe, sub_dir) = self
                .find_subpackage(&parent_recipe, &parent_dir, child)?
                .ok_or_else(|| Error::PackageNotFound {
                    name: dep.name.0.clone(),
                    requested_by: vec![requester.0.clone()],
                })?;
            let full_name = PackageName::new(format!("{parent_str}:{child}"));
            self.visit(
                full_name.clone(),
                sub_dir,
                parent_version,
                sub_recipe,
                dep.sub_configuration.as_deref(),
                resolution,
                packages,
                visiting,
            )?;
            return Ok(Some(full_name));
        }

        match resolution.version_of(&dep.name) {
            Some(version) => {
                let version = version.clone();
                let (recipe, dir) = self.load_recipe_and_dir(&dep.name, &version)?;
                self.visit(
                    dep.name.clone(),
                    dir,
                    version,
                    recipe,
                    dep.sub_configuration.as_deref(),
                    resolution,
                    packages,
                    visiting,
                )?;
                Ok(Some(dep.name.clone()))
            }
            None if dep.optional => Ok(None),
            None => Err(Error::PackageNotFound {
                name: dep.name.0.clone(),
                requested_by: vec![requester.0.clone()],
            }),
        }
    }

    /// Find `child` among `parent`'s declared subpackages, loading a
    /// path-referenced one from disk if necessary. Returns the directory
    /// the subpackage's own relative paths resolve against: `parent_dir`
    /// for an inline subpackage, the joined path for a `Path` one.
    fn find_subpackage(
        &self,
        parent: &Recipe,
        parent_dir: &Path,
        child: &str,
    ) -> Result<Option<(Recipe, PathBuf)>> {
        for sub in &parent.subpackages {
            match sub {
                SubpackageRef::Inline(r) if r.name.0 == child => {
                    return Ok(Some(((**r).clone(), parent_dir.to_path_buf())))
                }
                SubpackageRef::Inline(_) => {}
                SubpackageRef::Path(rel) => {
                    let dir = parent_dir.join(rel);
                    let recipe = self.manager.load_recipe_at(&dir)?;
                    if recipe.name.0 == child {
                        return Ok(Some((recipe, dir)));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Load a resolved package's recipe and the directory it lives in,
    /// preferring the package manager (which knows fetched/path/override
    /// locations) and falling back to a supplier for a recipe that has not
    /// been fetched to disk yet (in which case no directory is available,
    /// and path-based subpackage references under it cannot be resolved).
    fn load_recipe_and_dir(&self, name: &PackageName, version: &VersionId) -> Result<(Recipe, PathBuf)> {
        if let Ok(dir) = self.manager.locate(name, version) {
            let recipe = self.manager.get_package(name, version)?;
            return Ok((recipe, dir));
        }
        for supplier in self.suppliers {
            if let Ok(recipe) = supplier.fetch_recipe(&name.0, version) {
                return Ok((recipe, PathBuf::new()));
            }
        }
        Err(Error::PackageNotFound {
            name: name.0.clone(),
            requested_by: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests;
