// src/generator/description.rs

//! External-description emitters: the other branch of `Generator`
//! (`spec.md` §4.8). Rather than invoking the compiler itself, an emitter
//! serializes the target graph and its `BuildSettings` into a build-tool
//! description a downstream tool consumes. IDE project emitters are listed
//! only by this same interface in `spec.md` §6 and are otherwise out of
//! scope; `MakefileGenerator` here is the one reference emitter this crate
//! carries end to end.

use std::fmt::Write as _;
use std::path::PathBuf;

use crate::error::Result;
use crate::recipe::TargetType;

use super::{Generator, GeneratorContext, GeneratorOutcome};

/// An emitter that writes a description to a file instead of compiling.
pub trait DescriptionEmitter {
    fn emit(&self, ctx: &GeneratorContext) -> Result<String>;
}

/// Emits a POSIX Makefile with one phony target per package, each
/// depending on its link dependencies' targets and invoking the
/// configured compiler's flags literally. Not executed by this crate;
/// the point of an external-description emitter is that some other tool
/// (`make`, here) drives the actual build (`spec.md` §1 "IDE project
/// emitters ... listed only in the generator interface").
#[derive(Debug, Default)]
pub struct MakefileGenerator;

impl MakefileGenerator {
    pub fn new() -> Self {
        MakefileGenerator
    }
}

impl DescriptionEmitter for MakefileGenerator {
    fn emit(&self, ctx: &GeneratorContext) -> Result<String> {
        let mut out = String::new();
        writeln!(out, "# Generated by dub describe --generate=make").unwrap();
        writeln!(out, ".PHONY: all {}", all_goal(ctx)).unwrap();
        writeln!(out, "all: {}", all_goal(ctx)).unwrap();
        writeln!(out).unwrap();

        for target in &ctx.graph.targets {
            let goal = target.package.0.replace(':', "_");
            let deps: Vec<String> = target
                .link_dependencies
                .iter()
                .map(|d| d.0.replace(':', "_"))
                .collect();
            writeln!(out, ".PHONY: {goal}").unwrap();
            writeln!(out, "{goal}: {}", deps.join(" ")).unwrap();

            let compiler = ctx.compiler.name();
            let flags = target.settings.dflags.join(" ");
            let sources = target.settings.source_files.join(" ");
            let import_flags: Vec<String> = target
                .settings
                .import_paths
                .iter()
                .map(|p| format!("-I{p}"))
                .collect();

            let action = match target.target_type {
                TargetType::Executable => format!(
                    "\t{compiler} {flags} {} -of{} {sources}",
                    import_flags.join(" "),
                    target.output_file_name
                ),
                TargetType::StaticLibrary | TargetType::DynamicLibrary | TargetType::Library => {
                    format!(
                        "\t{compiler} {flags} {} -lib -of{} {sources}",
                        import_flags.join(" "),
                        target.output_file_name
                    )
                }
                TargetType::Object => format!(
                    "\t{compiler} {flags} {} -c -of{} {sources}",
                    import_flags.join(" "),
                    target.output_file_name
                ),
                TargetType::None | TargetType::SourceLibrary => String::new(),
            };
            if !action.is_empty() {
                writeln!(out, "{action}").unwrap();
            }
            writeln!(out).unwrap();
        }
        Ok(out)
    }
}

fn all_goal(ctx: &GeneratorContext) -> String {
    ctx.graph
        .targets
        .last()
        .map(|t| t.package.0.replace(':', "_"))
        .unwrap_or_default()
}

/// Wraps a `DescriptionEmitter` as a `Generator` that writes the
/// description to `<scratch_dir>/<file_name>` instead of producing
/// compiled artifacts.
pub struct GeneratorAdapter<E> {
    emitter: E,
    file_name: String,
}

impl<E: DescriptionEmitter> GeneratorAdapter<E> {
    pub fn new(emitter: E, file_name: impl Into<String>) -> Self {
        GeneratorAdapter {
            emitter,
            file_name: file_name.into(),
        }
    }
}

impl<E: DescriptionEmitter> Generator for GeneratorAdapter<E> {
    fn name(&self) -> &str {
        "description"
    }

    fn run(&self, ctx: &GeneratorContext) -> Result<GeneratorOutcome> {
        let description = self.emitter.emit(ctx)?;
        let path: PathBuf = ctx.scratch_dir.join(&self.file_name);
        ctx.filesystem.write(&path, description.as_bytes())?;
        let mut artifacts = std::collections::BTreeMap::new();
        if let Some(root_target) = ctx.graph.get(&ctx.project.root.name) {
            artifacts.insert(root_target.package.clone(), path);
        }
        Ok(GeneratorOutcome { artifacts })
    }
}
