// src/generator/mod.rs

//! Generator dispatch (C8): a [`Generator`] is either the direct builder
//! ([`DirectBuilder`]), which drives [`crate::interfaces::Compiler`]
//! straight to an installed artifact, or an external-description emitter
//! that serializes the target graph to a build-tool description instead
//! (`spec.md` §4.8). Both consume the same [`crate::target::TargetGraph`]
//! and per-target `BuildSettings`.

mod description;
mod direct;

pub use description::{DescriptionEmitter, GeneratorAdapter, MakefileGenerator};
pub use direct::DirectBuilder;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::interfaces::{BuildPlatform, Compiler, FileSystem};
use crate::project::Project;
use crate::target::TargetGraph;

/// A cooperative cancellation token: any suspension point crossing a
/// `PackageSupplier`/`FileSystem`/`Compiler` call checks this between
/// atomic units (`spec.md` §5 "Suspension points").
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a `Generator` needs to turn a resolved `Project` and its
/// `TargetGraph` into either built artifacts or an emitted description.
pub struct GeneratorContext<'a> {
    pub project: &'a Project,
    pub graph: &'a TargetGraph,
    pub platform: &'a BuildPlatform,
    pub compiler: &'a dyn Compiler,
    pub filesystem: &'a dyn FileSystem,
    /// Scratch directory for one invocation; removed on exit by the
    /// caller (`spec.md` §6 "Cache layout on disk").
    pub scratch_dir: PathBuf,
    /// Degree of target-build parallelism; default is the number of CPUs
    /// (`spec.md` §5).
    pub parallelism: usize,
    pub cancellation: CancellationToken,
}

/// The outcome of driving a `Generator` to completion: per-target output
/// paths, keyed by package name, for whichever targets produced one.
#[derive(Debug, Clone, Default)]
pub struct GeneratorOutcome {
    pub artifacts: std::collections::BTreeMap<crate::recipe::PackageName, PathBuf>,
}

pub trait Generator {
    fn name(&self) -> &str;
    fn run(&self, ctx: &GeneratorContext) -> Result<GeneratorOutcome>;
}
