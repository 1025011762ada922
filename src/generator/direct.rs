// src/generator/direct.rs

//! The direct builder: walks the target graph in topological order and
//! drives the injected [`Compiler`] straight to a cached artifact
//! (`spec.md` §4.8, steps 1-5).

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::cache::{BuildCache, BuildManifest};
use crate::error::{Error, Result};
use crate::hash::{hash_file, Digest256};
use crate::recipe::{PackageName, TargetType};
use crate::target::{build_id, BuildId, Target};

use super::{Generator, GeneratorContext, GeneratorOutcome};

/// The direct compiler-driving generator. Stateless: every invocation
/// starts from a fresh `GeneratorContext`, matching `spec.md` §9's
/// rejection of process-wide mutable state ("all mutable state is owned by
/// the invocation and passed explicitly").
#[derive(Debug, Default)]
pub struct DirectBuilder;

impl DirectBuilder {
    pub fn new() -> Self {
        DirectBuilder
    }
}

impl Generator for DirectBuilder {
    fn name(&self) -> &str {
        "direct"
    }

    fn run(&self, ctx: &GeneratorContext) -> Result<GeneratorOutcome> {
        let layers = layer_by_dependency_depth(&ctx.graph.targets);

        let mut dep_build_ids: BTreeMap<PackageName, BuildId> = BTreeMap::new();
        let mut artifacts: BTreeMap<PackageName, PathBuf> = BTreeMap::new();

        for layer in layers {
            if ctx.cancellation.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(ctx.parallelism.max(1))
                .build()
                .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

            let results: Vec<Result<(PackageName, BuildId, PathBuf)>> = pool.install(|| {
                use rayon::prelude::*;
                layer
                    .par_iter()
                    .map(|target| build_one(target, ctx, &dep_build_ids, &artifacts))
                    .collect()
            });

            for result in results {
                let (name, id, artifact) = result?;
                dep_build_ids.insert(name.clone(), id);
                artifacts.insert(name, artifact);
            }
        }

        Ok(GeneratorOutcome { artifacts })
    }
}

/// Build one target: compute its build-id, consult the cache, and on a
/// miss invoke the compiler (and linker, for link-producing target
/// types), installing the result atomically (`spec.md` §4.7).
fn build_one(
    target: &Target,
    ctx: &GeneratorContext,
    dep_build_ids: &BTreeMap<PackageName, BuildId>,
    built_artifacts: &BTreeMap<PackageName, PathBuf>,
) -> Result<(PackageName, BuildId, PathBuf)> {
    let file_hasher = |p: &std::path::Path| -> Result<Digest256> { Ok(hash_file(p)?) };
    let id = build_id(target, ctx.platform, ctx.compiler, dep_build_ids, &file_hasher)?;

    let cache = BuildCache::new(&target.package_dir);
    if let Some(artifact) = cache.lookup(&id)? {
        tracing::debug!(package = %target.package, build_id = %id, "cache hit");
        return Ok((target.package.clone(), id, artifact));
    }
    tracing::debug!(package = %target.package, build_id = %id, "cache miss, invoking compiler");

    let mut settings = target.settings.clone();
    for dep in &target.link_dependencies {
        if let Some(artifact) = built_artifacts.get(dep) {
            settings.libs.push(artifact.display().to_string());
        }
    }
    ctx.compiler.prepare_build_settings(&mut settings, ctx.platform, None)?;
    let artifact_name = ctx.compiler.target_file_name(&settings, ctx.platform);

    let manifest = BuildManifest {
        package: target.package.0.clone(),
        build_type: target.build_type.clone(),
        artifact_file_name: artifact_name.clone(),
        inputs: settings.source_files.clone(),
    };

    let installed = cache.install(&id, manifest, |tmp_dir| {
        let output = ctx.compiler.invoke(&settings, ctx.platform)?;
        if !output.success() {
            return Err(Error::Compile {
                target: target.package.0.clone(),
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }

        if matches!(target.target_type, TargetType::Executable | TargetType::DynamicLibrary) {
            let objects: Vec<PathBuf> = settings.source_files.iter().map(PathBuf::from).collect();
            let link_output = ctx.compiler.invoke_linker(&settings, ctx.platform, &objects)?;
            if !link_output.success() {
                return Err(Error::Link {
                    target: target.package.0.clone(),
                    exit_code: link_output.exit_code,
                    stderr: link_output.stderr,
                });
            }
        }

        std::fs::write(tmp_dir.join(&artifact_name), format!("{id}"))?;
        Ok(())
    })?;

    Ok((target.package.clone(), id, installed))
}

/// Group targets into layers by their longest dependency chain so every
/// target in a layer depends only on targets in earlier layers. Layers
/// build in parallel; layers themselves are sequential
/// (`spec.md` §4.8 "Parallelism": non-dependent targets may build
/// concurrently).
fn layer_by_dependency_depth(targets: &[Target]) -> Vec<Vec<Target>> {
    let mut depth: BTreeMap<PackageName, usize> = BTreeMap::new();
    for target in targets {
        let d = target
            .link_dependencies
            .iter()
            .map(|dep| depth.get(dep).copied().unwrap_or(0) + 1)
            .max()
            .unwrap_or(0);
        depth.insert(target.package.clone(), d);
    }

    let max_depth = depth.values().copied().max().unwrap_or(0);
    let mut layers: Vec<Vec<Target>> = (0..=max_depth).map(|_| Vec::new()).collect();
    for target in targets {
        let d = depth[&target.package];
        layers[d].push(target.clone());
    }
    layers.into_iter().filter(|l| !l.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::CancellationToken;
    use crate::interfaces::testing::FakeCompiler;
    use crate::interfaces::{BuildPlatform, StdFileSystem};
    use crate::project::{Project, ProjectPackage};
    use crate::recipe::{BuildSettings, Recipe};
    use crate::target::build_target_graph;
    use std::collections::BTreeMap as Map;

    fn platform() -> BuildPlatform {
        BuildPlatform {
            os: vec!["linux".to_string()],
            architecture: vec!["x86_64".to_string()],
            compiler_name: "fakec".to_string(),
            frontend_version: "1.0.0".to_string(),
            vendor: "test".to_string(),
        }
    }

    fn project_with_source(dir: &std::path::Path) -> Project {
        std::fs::write(dir.join("main.d"), "void main() {}").unwrap();
        let mut settings = BuildSettings::default();
        settings.source_files = vec!["main.d".to_string()];
        let root = ProjectPackage {
            name: PackageName::new("app"),
            version: crate::version::VersionId::path(dir),
            dir: dir.to_path_buf(),
            recipe: Recipe::new(PackageName::new("app")),
            configuration: "application".to_string(),
            target_type: TargetType::Executable,
            own_settings: settings.clone(),
            settings,
            dependencies: vec![],
        };
        Project {
            root,
            packages: Map::new(),
        }
    }

    #[test]
    fn builds_then_hits_cache_on_second_run() {
        let dir = tempfile::tempdir().unwrap();
        let project = project_with_source(dir.path());
        let graph = build_target_graph(&project, "debug").unwrap();
        let compiler = FakeCompiler::new();
        let fs = StdFileSystem;
        let platform = platform();

        let ctx = GeneratorContext {
            project: &project,
            graph: &graph,
            platform: &platform,
            compiler: &compiler,
            filesystem: &fs,
            scratch_dir: dir.path().join("scratch"),
            parallelism: 2,
            cancellation: CancellationToken::new(),
        };

        let builder = DirectBuilder::new();
        let first = builder.run(&ctx).unwrap();
        let artifact = first.artifacts.get(&PackageName::new("app")).unwrap().clone();
        assert!(artifact.is_file());

        let second = builder.run(&ctx).unwrap();
        assert_eq!(second.artifacts.get(&PackageName::new("app")).unwrap(), &artifact);
    }

    #[test]
    fn compile_failure_surfaces_as_compile_error() {
        let dir = tempfile::tempdir().unwrap();
        let project = project_with_source(dir.path());
        let graph = build_target_graph(&project, "debug").unwrap();
        let compiler = FakeCompiler::new();
        compiler.fail("main.d");
        let fs = StdFileSystem;
        let platform = platform();

        let ctx = GeneratorContext {
            project: &project,
            graph: &graph,
            platform: &platform,
            compiler: &compiler,
            filesystem: &fs,
            scratch_dir: dir.path().join("scratch"),
            parallelism: 1,
            cancellation: CancellationToken::new(),
        };

        let builder = DirectBuilder::new();
        let err = builder.run(&ctx).unwrap_err();
        assert!(matches!(err, Error::Compile { .. }));
    }
}
