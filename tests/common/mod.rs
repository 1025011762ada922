// tests/common/mod.rs
//
// Shared fixtures for the end-to-end scenarios in `tests/end_to_end.rs`:
// building a small catalog of recipes behind a `FakeSupplier`, resolving
// it, fetching the resolution to disk through the real `PackageManager`,
// and driving the resulting project through the real target graph and
// `DirectBuilder` with a `FakeCompiler`. Every stage after `resolve` runs
// against real temporary directories, so these tests exercise the same
// code path a real build would, short of a real compiler and registry.

use std::path::PathBuf;

use dub::generator::{CancellationToken, DirectBuilder, Generator, GeneratorContext, GeneratorOutcome};
use dub::interfaces::testing::FakeCompiler;
use dub::interfaces::{BuildPlatform, PackageSupplier, StdFileSystem};
use dub::package_manager::{FetchLocation, PackageManager};
use dub::project::{Project, ProjectBuilder};
use dub::recipe::{
    BuildSettings, Configuration, Dependency, PackageName, Platform, PlatformPredicate, Recipe, TargetType,
};
use dub::resolver::{resolve, ResolverOptions};
use dub::target::{build_target_graph, TargetGraph};
use dub::version::{Constraint, VersionId};

/// A library recipe whose single source file is the one name
/// `FakeSupplier::fetch_archive` always produces (`<name>.d`), so fetching
/// it to disk and building it needs no bespoke archive bytes.
pub fn library(name: &str, deps: &[(&str, &str)]) -> Recipe {
    configured(name, TargetType::Library, deps)
}

pub fn executable(name: &str, deps: &[(&str, &str)]) -> Recipe {
    configured(name, TargetType::Executable, deps)
}

fn configured(name: &str, target_type: TargetType, deps: &[(&str, &str)]) -> Recipe {
    let mut recipe = Recipe::new(PackageName::new(name));
    for (dep_name, constraint) in deps {
        recipe.dependencies.push(Dependency::new(
            PackageName::new(*dep_name),
            Constraint::parse(constraint).unwrap(),
        ));
    }
    let mut settings = BuildSettings::default();
    settings.source_files = vec![format!("{name}.d")];
    recipe.configurations.push(Configuration {
        name: "library".to_string(),
        target_type,
        platforms: Vec::new(),
        settings: vec![(PlatformPredicate::any(), settings)],
    });
    recipe
}

pub fn release(v: &str) -> VersionId {
    VersionId::Release(semver::Version::parse(v).unwrap())
}

pub fn fresh_manager() -> (PackageManager, tempfile::TempDir, tempfile::TempDir) {
    let user = tempfile::tempdir().unwrap();
    let system = tempfile::tempdir().unwrap();
    (
        PackageManager::new(user.path().to_path_buf(), system.path().to_path_buf()),
        user,
        system,
    )
}

/// Fully build `root` (already written to `root_dir`) against `catalog`:
/// resolve, fetch, expand the project, build the target graph, and drive
/// it through `DirectBuilder` with a `FakeCompiler`. Returns the outcome
/// plus the platform/compiler used, so a caller can re-run the same
/// pipeline to exercise cache hits.
pub struct Pipeline {
    pub manager: PackageManager,
    pub compiler: FakeCompiler,
    pub platform: BuildPlatform,
    pub project: Project,
    pub graph: TargetGraph,
}

pub fn fake_platform() -> BuildPlatform {
    BuildPlatform {
        os: vec!["linux".to_string()],
        architecture: vec!["x86_64".to_string()],
        compiler_name: "fakec".to_string(),
        frontend_version: "1.0.0".to_string(),
        vendor: "test".to_string(),
    }
}

pub fn build_pipeline(
    root: &Recipe,
    root_dir: &std::path::Path,
    catalog: impl Iterator<Item = (String, VersionId, Recipe)>,
    prior: Option<&dub::selection::Selection>,
    options: ResolverOptions,
) -> dub::error::Result<Pipeline> {
    let fake = dub::interfaces::testing::FakeSupplier::new();
    for (name, version, recipe) in catalog {
        fake.add(&name, version, recipe);
    }
    let suppliers: Vec<Box<dyn PackageSupplier>> = vec![Box::new(fake)];

    let (mut manager, _user, _system) = fresh_manager();
    let resolution = resolve(root, &suppliers, &manager, prior, options)?;

    for (name, pkg) in &resolution.packages {
        if let VersionId::Path(_) = pkg.version {
            continue;
        }
        manager.fetch(name, &pkg.version, suppliers[0].as_ref(), FetchLocation::User)?;
    }

    let platform = Platform::host();
    let builder = ProjectBuilder::new(&manager, &[], platform);
    let project = builder.build(root, root_dir, &resolution, None)?;
    let graph = build_target_graph(&project, "debug")?;

    Ok(Pipeline {
        manager,
        compiler: FakeCompiler::new(),
        platform: fake_platform(),
        project,
        graph,
    })
}

pub fn run_generator(pipeline: &Pipeline, scratch_dir: PathBuf) -> dub::error::Result<GeneratorOutcome> {
    let fs = StdFileSystem;
    let ctx = GeneratorContext {
        project: &pipeline.project,
        graph: &pipeline.graph,
        platform: &pipeline.platform,
        compiler: &pipeline.compiler,
        filesystem: &fs,
        scratch_dir,
        parallelism: 2,
        cancellation: CancellationToken::new(),
    };
    DirectBuilder::new().run(&ctx)
}
