// src/target/mod.rs

//! Target graph & fingerprint (C6): expand a resolved [`crate::project::Project`]
//! into the ordered DAG of compiler targets it implies, and compute a
//! build-id — a SHA-256 over every input that can change a compiler
//! invocation's output — for each one (`spec.md` §4.6).
//!
//! Every package whose target type `produces_target()` (i.e. not `none`/
//! `sourceLibrary`) gets one [`Target`]. Link dependencies flow from an
//! executable/dynamic-library target through any chain of source-library
//! or non-producing packages to the transitive static/dynamic-library
//! targets a final link step actually needs; a source library itself
//! never appears as a link input, only as a pass-through to whatever it
//! in turn depends on.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use crate::error::{Error, Result};
use crate::hash::{CanonicalHasher, Digest256};
use crate::interfaces::{BuildPlatform, Compiler};
use crate::project::Project;
use crate::recipe::{BuildSettings, PackageName, TargetType};


/// A build-id: a 256-bit digest over everything that affects one target's
/// compiler invocation. Used directly as the build cache's key.
pub type BuildId = Digest256;

/// One compiled target: `(package, configuration, build-type, platform)`
/// per `spec.md` §3, minus the platform itself (every target here is
/// already specific to the one platform its `Project` was built for).
#[derive(Debug, Clone)]
pub struct Target {
    pub package: PackageName,
    /// Directory the target's relative source/import paths resolve
    /// against; empty for a package whose recipe was never fetched to
    /// disk (only possible for an inactive/optional dependency, which
    /// never reaches `build_target_graph`).
    pub package_dir: std::path::PathBuf,
    pub configuration: String,
    pub build_type: String,
    pub target_type: TargetType,
    /// The project's merged settings for this package, with the recipe's
    /// own `buildTypes[build_type]` overlay (if any) folded in underneath
    /// them — a build-type preset is a base layer a configuration's own
    /// settings still take precedence over.
    pub settings: BuildSettings,
    /// Transitive static/dynamic-library dependencies a final link step
    /// needs, collapsed past any source-library/non-producing hop
    /// (`spec.md` §4.6).
    pub link_dependencies: Vec<PackageName>,
    pub output_file_name: String,
}

/// The target graph: every activated package's `Target`, in topological
/// order (a target's dependencies always precede it; ties broken by
/// package name).
#[derive(Debug, Clone, Default)]
pub struct TargetGraph {
    pub targets: Vec<Target>,
}

impl TargetGraph {
    pub fn get(&self, name: &PackageName) -> Option<&Target> {
        self.targets.iter().find(|t| &t.package == name)
    }
}

/// Expand `project` into its `TargetGraph` for `build_type`. Cycles among
/// link dependencies are a fatal `Error::Cycle` (`spec.md` §4.6); cycles
/// among path-based subpackages that never cross a linkable dependency
/// were already tolerated one layer up, in the resolver (`spec.md` §4.4).
pub fn build_target_graph(project: &Project, build_type: &str) -> Result<TargetGraph> {
    let mut targets: BTreeMap<PackageName, Target> = BTreeMap::new();

    for pkg in project.all() {
        if !pkg.target_type.produces_target() {
            continue;
        }

        let mut settings = pkg.settings.clone();
        if let Some(overlay) = pkg.recipe.build_types.get(build_type) {
            let mut with_overlay = overlay.clone();
            with_overlay.merge(&settings, false);
            settings = with_overlay;
        }

        let link_dependencies = collect_link_dependencies(project, &pkg.name, &mut HashSet::new());
        let output_file_name = derive_output_file_name(&pkg.name, pkg.target_type);

        targets.insert(
            pkg.name.clone(),
            Target {
                package: pkg.name.clone(),
                package_dir: pkg.dir.clone(),
                configuration: pkg.configuration.clone(),
                build_type: build_type.to_string(),
                target_type: pkg.target_type,
                settings,
                link_dependencies,
                output_file_name,
            },
        );
    }

    let order = topological_order(&targets);
    if order.len() != targets.len() {
        let ordered: BTreeSet<&PackageName> = order.iter().collect();
        let unresolved: Vec<String> = targets
            .keys()
            .filter(|name| !ordered.contains(name))
            .map(|name| name.0.clone())
            .collect();
        return Err(Error::Cycle { edges: unresolved });
    }

    Ok(TargetGraph {
        targets: order.into_iter().map(|name| targets.remove(&name).unwrap()).collect(),
    })
}

/// Walk `name`'s activated dependencies, collapsing through any
/// non-linkable (source-library/`none`) hop, to the set of packages that
/// contribute an actual link input. `seen` bounds the walk to each
/// package once, which is both an optimization and the guard that keeps
/// the permitted path-based subpackage cycles from recursing forever.
fn collect_link_dependencies(
    project: &Project,
    name: &PackageName,
    seen: &mut HashSet<PackageName>,
) -> Vec<PackageName> {
    let mut result: BTreeSet<PackageName> = BTreeSet::new();
    let Some(pkg) = project.package(name) else {
        return Vec::new();
    };
    for dep_name in &pkg.dependencies {
        if !seen.insert(dep_name.clone()) {
            continue;
        }
        if let Some(dep_pkg) = project.package(dep_name) {
            if dep_pkg.target_type.is_linkable() {
                result.insert(dep_name.clone());
            }
            for transitive in collect_link_dependencies(project, dep_name, seen) {
                result.insert(transitive);
            }
        }
    }
    result.into_iter().collect()
}

/// Kahn's algorithm over the link-dependency edges (dependency before
/// dependent), ties broken by package name via the `BTreeSet` frontier.
/// Returns fewer names than `targets` iff a cycle remains.
fn topological_order(targets: &BTreeMap<PackageName, Target>) -> Vec<PackageName> {
    let mut in_degree: BTreeMap<PackageName, usize> = targets.keys().map(|n| (n.clone(), 0)).collect();
    let mut dependents: BTreeMap<PackageName, Vec<PackageName>> = BTreeMap::new();

    for (name, target) in targets {
        for dep in &target.link_dependencies {
            if targets.contains_key(dep) {
                *in_degree.get_mut(name).unwrap() += 1;
                dependents.entry(dep.clone()).or_default().push(name.clone());
            }
        }
    }

    let mut ready: BTreeSet<PackageName> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(name, _)| name.clone())
        .collect();

    let mut order = Vec::with_capacity(targets.len());
    while let Some(name) = ready.iter().next().cloned() {
        ready.remove(&name);
        if let Some(dependents_of) = dependents.get(&name) {
            for dependent in dependents_of {
                let degree = in_degree.get_mut(dependent).unwrap();
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(dependent.clone());
                }
            }
        }
        order.push(name);
    }
    order
}

fn derive_output_file_name(name: &PackageName, target_type: TargetType) -> String {
    let base = name.0.replace(':', "_");
    match target_type {
        TargetType::Executable => base,
        TargetType::StaticLibrary | TargetType::Library => format!("lib{base}.a"),
        TargetType::DynamicLibrary => format!("lib{base}.so"),
        TargetType::Object => format!("{base}.o"),
        TargetType::None | TargetType::SourceLibrary => base,
    }
}

/// Compute `target`'s build-id: a canonical, fixed-order SHA-256 over
/// every input `spec.md` §4.6 lists that can change what the compiler
/// produces. `dep_build_ids` supplies the already-computed build-ids of
/// `target`'s link dependencies (structural hashing of the subgraph —
/// `DirectBuilder` builds in dependency order, so these are always
/// present by the time a dependent target is fingerprinted); `file_hasher`
/// is injected rather than reading the filesystem directly so the hash
/// itself stays a pure function of its inputs.
///
/// Deliberately does not walk `import_paths`/`string_import_paths`
/// directories looking for files to hash: those paths are already part
/// of the hashed settings (step 4 below), and a full recursive directory
/// scan would make the build-id depend on files a target's own recipe
/// never declared as sources. `source_files` is the one field this
/// crate treats as the authoritative "files whose content matters" list.
pub fn build_id<F>(
    target: &Target,
    platform: &BuildPlatform,
    compiler: &dyn Compiler,
    dep_build_ids: &BTreeMap<PackageName, BuildId>,
    file_hasher: F,
) -> Result<BuildId>
where
    F: Fn(&Path) -> Result<Digest256>,
{
    let mut hasher = CanonicalHasher::new();

    // 1+2: compiler binary identity/version and platform probe output.
    hasher.update_str(compiler.name());
    hasher.update_str(&platform.compiler_name);
    hasher.update_str(&platform.frontend_version);
    hasher.update_str(&platform.vendor);
    for os in &platform.os {
        hasher.update_str(os);
    }
    for arch in &platform.architecture {
        hasher.update_str(arch);
    }

    // 3: target type.
    hasher.update_str(&format!("{:?}", target.target_type));

    // 4: merged build settings, sorted within unordered fields.
    hash_settings(&mut hasher, &target.settings);

    // 5: content hash of every declared source file.
    if !target.package_dir.as_os_str().is_empty() {
        let mut sources: Vec<&String> = target.settings.source_files.iter().collect();
        sources.sort();
        for source in sources {
            let digest = file_hasher(&target.package_dir.join(source))?;
            hasher.update_digest(&digest);
        }
    }

    // 6: content hash of every input library, falling back to hashing the
    // bare name for a system library with no file on disk (`-lpthread`-style
    // entries have no content to hash, only an identity).
    let mut libs: Vec<&String> = target.settings.libs.iter().collect();
    libs.sort();
    for lib in libs {
        let path = target.package_dir.join(lib);
        let digest = if path.is_file() {
            file_hasher(&path)?
        } else {
            crate::hash::hash_bytes(lib.as_bytes())
        };
        hasher.update_digest(&digest);
    }

    // 7: structural hash of the dependency subgraph via each dependency's
    // own build-id, in package-name order.
    let mut deps: Vec<&PackageName> = target.link_dependencies.iter().collect();
    deps.sort();
    for dep in deps {
        hasher.update_str(&dep.0);
        match dep_build_ids.get(dep) {
            Some(id) => hasher.update_digest(id),
            None => hasher.update_str("<unbuilt>"),
        };
    }

    // 8: effective build-type name.
    hasher.update_str(&target.build_type);

    // 9: selected architecture.
    hasher.update_str(platform.primary_arch());

    Ok(hasher.finalize())
}

/// Feed every `BuildSettings` field into `hasher` in a fixed order.
/// Path/version/lib/copy-file arrays have no declared ordering semantics
/// (`spec.md` §3: "concatenation with de-duplication"), so they are
/// sorted before hashing; flag arrays and hook commands are order-
/// sensitive and are hashed exactly as declared.
fn hash_settings(hasher: &mut CanonicalHasher, settings: &BuildSettings) {
    hash_sorted(hasher, "versions", &settings.versions);
    hash_sorted(hasher, "importPaths", &settings.import_paths);
    hash_sorted(hasher, "stringImportPaths", &settings.string_import_paths);
    hash_sorted(hasher, "sourceFiles", &settings.source_files);
    hash_sorted(hasher, "excludedSourceFiles", &settings.excluded_source_files);
    hash_sorted(hasher, "libs", &settings.libs);
    hash_sorted(hasher, "copyFiles", &settings.copy_files);

    hash_ordered(hasher, "dflags", &settings.dflags);
    hash_ordered(hasher, "lflags", &settings.lflags);
    hash_ordered(hasher, "cflags", &settings.cflags);

    hasher.update_str("environments");
    let mut env: Vec<(&String, &String)> = settings.environments.iter().collect();
    env.sort_by_key(|(k, _)| k.as_str());
    for (k, v) in env {
        hasher.update_str(k);
        hasher.update_str(v);
    }

    hash_hooks(hasher, "preBuildCommands", &settings.pre_build_commands);
    hash_hooks(hasher, "postBuildCommands", &settings.post_build_commands);
    hash_hooks(hasher, "preGenerateCommands", &settings.pre_generate_commands);
    hash_hooks(hasher, "postGenerateCommands", &settings.post_generate_commands);
}

fn hash_sorted(hasher: &mut CanonicalHasher, label: &str, items: &[String]) {
    hasher.update_str(label);
    let mut sorted: Vec<&String> = items.iter().collect();
    sorted.sort();
    for item in sorted {
        hasher.update_str(item);
    }
}

fn hash_ordered(hasher: &mut CanonicalHasher, label: &str, items: &[String]) {
    hasher.update_str(label);
    for item in items {
        hasher.update_str(item);
    }
}

fn hash_hooks(hasher: &mut CanonicalHasher, label: &str, hooks: &[crate::recipe::HookCommand]) {
    hasher.update_str(label);
    for hook in hooks {
        hasher.update_str(&hook.command);
        hasher.update_str(hook.working_directory.as_deref().unwrap_or(""));
    }
}
