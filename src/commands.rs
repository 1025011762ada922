// src/commands.rs

//! Handlers for each CLI subcommand, wiring the core modules together the
//! way `spec.md` §2 "Control flow" describes: the selection file (C9) is
//! loaded, the resolver (C4) reconciles it against the root recipe, the
//! project builder (C5) expands the result, the target graph (C6) is
//! derived and the generator (C8) drives the compiler through the build
//! cache (C7).

use std::path::{Path, PathBuf};
use std::process::Command as ProcessCommand;

use tracing::info;

use dub::cache::BuildCache;
use dub::compiler::DmdCompiler;
use dub::error::{Error, Result};
use dub::generator::{CancellationToken, DirectBuilder, Generator, GeneratorContext};
use dub::interfaces::{PackageSupplier, StdFileSystem};
use dub::package_manager::PackageManager;
use dub::project::ProjectBuilder;
use dub::recipe::{PackageName, Platform, Recipe};
use dub::resolver::{resolve, ResolverOptions, UpgradeMode};
use dub::selection::Selection;
use dub::target::build_target_graph;
use dub::version::VersionId;

use crate::cli::BuildArgs;

const SELECTIONS_FILE: &str = "dub.selections.json";

fn default_cache_roots() -> (PathBuf, PathBuf) {
    let user = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".dub")
        .join("packages");
    let system = PathBuf::from("/var/cache/dub/packages");
    (user, system)
}

fn load_root_recipe(root_dir: &Path) -> Result<Recipe> {
    let manager = PackageManager::new(PathBuf::new(), PathBuf::new());
    manager.load_recipe_at(root_dir)
}

/// Run the full resolve → project → target-graph pipeline shared by
/// `build`/`run`/`test`/`describe`.
struct Pipeline {
    project: dub::project::Project,
    graph: dub::target::TargetGraph,
    compiler: DmdCompiler,
    platform: dub::interfaces::BuildPlatform,
}

fn run_pipeline(root_dir: &Path, args: &BuildArgs, build_type: &str, upgrade: UpgradeMode) -> Result<Pipeline> {
    let root = load_root_recipe(root_dir)?;
    info!(package = %root.name, "loaded root recipe");

    let (user_root, system_root) = default_cache_roots();
    let mut manager = PackageManager::new(user_root, system_root);

    let selection_path = root_dir.join(SELECTIONS_FILE);
    let prior = Selection::load(&selection_path)?;
    let suppliers: Vec<Box<dyn PackageSupplier>> = Vec::new();

    let options = ResolverOptions {
        upgrade,
        diamond_merge: dub::version::MergeMode::Strict,
    };
    let resolution = resolve(&root, &suppliers, &manager, Some(&prior), options)?;

    let mut selection = Selection::new();
    for (name, pkg) in &resolution.packages {
        selection.set(name.clone(), pkg.version.clone());
    }
    selection.save(&selection_path)?;
    manager.add_local(root.name.clone(), root_dir.to_path_buf());

    let platform = Platform::host();
    let builder = ProjectBuilder::new(&manager, &suppliers, platform);
    let project = builder.build(&root, root_dir, &resolution, args.config.as_deref())?;

    let mut graph = build_target_graph(&project, build_type)?;
    // The named build-type vocabulary (`spec.md` §6: debug/release/unittest/...)
    // lowers to compiler-specific flags; that lowering belongs to the
    // concrete compiler driver, not the core target graph, so it is
    // folded in here rather than inside `build_target_graph` itself. A
    // recipe's own `buildTypes` overlay (already merged into each
    // target's settings) still layers on top of whatever this adds, since
    // that merge already ran before the graph was returned.
    let preset_flags = dub::compiler::build_type_flags(build_type);
    if !preset_flags.is_empty() {
        for target in &mut graph.targets {
            let mut preset = dub::recipe::BuildSettings::default();
            preset.dflags = preset_flags.clone();
            preset.merge(&target.settings, false);
            target.settings = preset;
        }
    }

    let compiler = DmdCompiler::locate(&args.compiler)?;
    let compiler_binary = which::which(&args.compiler).unwrap_or_else(|_| PathBuf::from(&args.compiler));
    let build_settings = dub::recipe::BuildSettings::default();
    let build_platform = compiler.determine_platform(&build_settings, &compiler_binary, args.arch.as_deref())?;

    Ok(Pipeline {
        project,
        graph,
        compiler,
        platform: build_platform,
    })
}

fn run_generator(pipeline: &Pipeline, args: &BuildArgs) -> Result<dub::generator::GeneratorOutcome> {
    let fs = StdFileSystem;
    let scratch = tempfile::tempdir().map_err(Error::Io)?;
    let ctx = GeneratorContext {
        project: &pipeline.project,
        graph: &pipeline.graph,
        platform: &pipeline.platform,
        compiler: &pipeline.compiler,
        filesystem: &fs,
        scratch_dir: scratch.path().to_path_buf(),
        parallelism: args.parallel.unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)),
        cancellation: CancellationToken::new(),
    };
    DirectBuilder::new().run(&ctx)
}

pub fn build(root_dir: &Path, args: &BuildArgs) -> Result<()> {
    let pipeline = run_pipeline(root_dir, args, &args.build_type, UpgradeMode::None)?;
    let outcome = run_generator(&pipeline, args)?;
    for (name, path) in &outcome.artifacts {
        info!(package = %name, artifact = %path.display(), "built");
    }
    println!("built {} target(s)", outcome.artifacts.len());
    Ok(())
}

pub fn run(root_dir: &Path, args: &BuildArgs, program_args: &[String]) -> Result<()> {
    let pipeline = run_pipeline(root_dir, args, &args.build_type, UpgradeMode::None)?;
    let outcome = run_generator(&pipeline, args)?;
    let root_name = pipeline.project.root.name.clone();
    let artifact = outcome.artifacts.get(&root_name).ok_or_else(|| Error::PackageNotFound {
        name: root_name.0.clone(),
        requested_by: Vec::new(),
    })?;

    let status = ProcessCommand::new(artifact)
        .args(program_args)
        .current_dir(root_dir)
        .status()
        .map_err(Error::Io)?;
    std::process::exit(status.code().unwrap_or(1));
}

pub fn test(root_dir: &Path, args: &BuildArgs) -> Result<()> {
    let mut args = args.clone();
    args.build_type = "unittest".to_string();
    let pipeline = run_pipeline(root_dir, &args, &args.build_type, UpgradeMode::None)?;
    let outcome = run_generator(&pipeline, &args)?;
    let root_name = pipeline.project.root.name.clone();
    if let Some(artifact) = outcome.artifacts.get(&root_name) {
        let status = ProcessCommand::new(artifact).current_dir(root_dir).status().map_err(Error::Io)?;
        std::process::exit(status.code().unwrap_or(1));
    }
    Ok(())
}

pub fn describe(root_dir: &Path, args: &BuildArgs) -> Result<()> {
    let pipeline = run_pipeline(root_dir, args, &args.build_type, UpgradeMode::None)?;
    let mut packages = Vec::new();
    for pkg in pipeline.project.all() {
        packages.push(serde_json::json!({
            "name": pkg.name.0,
            "version": pkg.version.to_string(),
            "configuration": pkg.configuration,
            "targetType": format!("{:?}", pkg.target_type),
            "dependencies": pkg.dependencies.iter().map(|d| d.0.clone()).collect::<Vec<_>>(),
        }));
    }
    let doc = serde_json::json!({ "rootPackage": pipeline.project.root.name.0, "packages": packages });
    println!("{}", serde_json::to_string_pretty(&doc).map_err(|e| Error::Serialization(e.to_string()))?);
    Ok(())
}

pub fn upgrade(root_dir: &Path, prerelease: bool) -> Result<()> {
    let args = BuildArgs::default();
    let mode = if prerelease { UpgradeMode::Prerelease } else { UpgradeMode::Compatible };
    let pipeline = run_pipeline(root_dir, &args, "debug", mode)?;
    println!("upgraded selection for {} package(s)", pipeline.project.packages.len());
    Ok(())
}

pub fn fetch(root_dir: &Path, name: &str, version: &str) -> Result<()> {
    let _ = root_dir;
    let (user_root, system_root) = default_cache_roots();
    let mut manager = PackageManager::new(user_root, system_root);
    let version_id = parse_version_arg(version)?;
    let suppliers: Vec<Box<dyn PackageSupplier>> = Vec::new();
    let supplier = suppliers.first().ok_or_else(|| Error::PackageNotFound {
        name: name.to_string(),
        requested_by: Vec::new(),
    })?;
    let dest = manager.fetch(
        &PackageName::new(name),
        &version_id,
        supplier.as_ref(),
        dub::package_manager::FetchLocation::User,
    )?;
    println!("fetched {name}@{version} into {}", dest.display());
    Ok(())
}

pub fn add_local(root_dir: &Path, name: &str, path: &Path) -> Result<()> {
    let _ = root_dir;
    let (user_root, system_root) = default_cache_roots();
    let mut manager = PackageManager::new(user_root, system_root);
    manager.add_local(PackageName::new(name), path.to_path_buf());
    println!("registered {name} -> {}", path.display());
    Ok(())
}

pub fn remove(name: &str, version: &str) -> Result<()> {
    let (user_root, system_root) = default_cache_roots();
    let mut manager = PackageManager::new(user_root, system_root);
    let version_id = parse_version_arg(version)?;
    manager.remove(&PackageName::new(name), &version_id, dub::package_manager::FetchLocation::User)?;
    println!("removed {name}@{version}");
    Ok(())
}

pub fn clean(root_dir: &Path) -> Result<()> {
    let cache = BuildCache::new(root_dir);
    let removed = cache.gc(&std::collections::HashSet::new())?;
    println!("removed {removed} cached build(s)");
    Ok(())
}

fn parse_version_arg(version: &str) -> Result<VersionId> {
    if let Some(branch) = version.strip_prefix('~') {
        return Ok(VersionId::branch(branch.to_string()));
    }
    semver::Version::parse(version)
        .map(VersionId::Release)
        .map_err(|e| Error::Serialization(format!("invalid version '{version}': {e}")))
}
