// src/interfaces/testing.rs

//! In-memory fakes for the four injectable interfaces, used throughout
//! this crate's resolver/build-id/cache tests and the end-to-end scenarios
//! from `spec.md` §8.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Instant, SystemTime};

use crate::error::{Error, Result};
use crate::recipe::{BuildSettings, Recipe};
use crate::version::VersionId;

use super::clock::Clock;
use super::compiler::{BuildOptions, BuildPlatform, Compiler, InvocationOutput};
use super::package_supplier::PackageSupplier;

/// A `PackageSupplier` backed by an in-memory map, standing in for a real
/// registry transport in tests.
#[derive(Default)]
pub struct FakeSupplier {
    packages: Mutex<HashMap<String, Vec<(VersionId, Recipe)>>>,
}

impl FakeSupplier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, name: &str, version: VersionId, recipe: Recipe) {
        self.packages
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .push((version, recipe));
    }
}

impl PackageSupplier for FakeSupplier {
    fn list_versions(&self, name: &str) -> Result<Vec<VersionId>> {
        Ok(self
            .packages
            .lock()
            .unwrap()
            .get(name)
            .map(|entries| entries.iter().map(|(v, _)| v.clone()).collect())
            .unwrap_or_default())
    }

    fn fetch_recipe(&self, name: &str, version: &VersionId) -> Result<Recipe> {
        self.packages
            .lock()
            .unwrap()
            .get(name)
            .and_then(|entries| entries.iter().find(|(v, _)| v == version).map(|(_, r)| r.clone()))
            .ok_or_else(|| Error::PackageNotFound {
                name: name.to_string(),
                requested_by: Vec::new(),
            })
    }

    fn fetch_archive(&self, name: &str, version: &VersionId) -> Result<Vec<u8>> {
        // The fake registry's archive is just the serialized recipe name;
        // real archive extraction is exercised via `extract_archive`
        // against a hand-built payload in the package-manager fetch test.
        let recipe = self.fetch_recipe(name, version)?;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(format!("{}.d\0", recipe.name.0).as_bytes());
        let contents = format!("module {};\n", recipe.name.0.replace('-', "_"));
        bytes.extend_from_slice(&(contents.len() as u32).to_le_bytes());
        bytes.extend_from_slice(contents.as_bytes());
        Ok(bytes)
    }

    fn describe(&self) -> String {
        "fake in-memory registry".to_string()
    }
}

/// A `Compiler` that never shells out: `invoke` computes a stable digest of
/// the source files it was asked to compile instead of running a real
/// toolchain, so resolver/cache/build-id tests are hermetic.
#[derive(Default)]
pub struct FakeCompiler {
    pub fail_targets: Mutex<Vec<String>>,
}

impl FakeCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, target: &str) {
        self.fail_targets.lock().unwrap().push(target.to_string());
    }
}

impl Compiler for FakeCompiler {
    fn name(&self) -> &str {
        "fakec"
    }

    fn determine_platform(
        &self,
        _settings: &BuildSettings,
        _binary: &Path,
        arch_override: Option<&str>,
    ) -> Result<BuildPlatform> {
        Ok(BuildPlatform {
            os: vec!["linux".to_string()],
            architecture: vec![arch_override.unwrap_or("x86_64").to_string()],
            compiler_name: "fakec".to_string(),
            frontend_version: "1.0.0".to_string(),
            vendor: "test".to_string(),
        })
    }

    fn prepare_build_settings(
        &self,
        _settings: &mut BuildSettings,
        _platform: &BuildPlatform,
        _included_fields: Option<&[&str]>,
    ) -> Result<()> {
        Ok(())
    }

    fn extract_build_options(&self, _settings: &mut BuildSettings) -> BuildOptions {
        BuildOptions(0)
    }

    fn target_file_name(&self, _settings: &BuildSettings, _platform: &BuildPlatform) -> String {
        "out".to_string()
    }

    fn set_target(&self, _settings: &mut BuildSettings, _platform: &BuildPlatform, _path: Option<&Path>) {}

    fn invoke(&self, settings: &BuildSettings, _platform: &BuildPlatform) -> Result<InvocationOutput> {
        for source in &settings.source_files {
            if self.fail_targets.lock().unwrap().contains(source) {
                return Ok(InvocationOutput {
                    stdout: String::new(),
                    stderr: format!("forced failure compiling {source}"),
                    exit_code: Some(1),
                });
            }
        }
        Ok(InvocationOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: Some(0),
        })
    }

    fn invoke_linker(
        &self,
        _settings: &BuildSettings,
        _platform: &BuildPlatform,
        _objects: &[PathBuf],
    ) -> Result<InvocationOutput> {
        Ok(InvocationOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: Some(0),
        })
    }

    fn lflags_to_dflags(&self, lflags: &[String]) -> Vec<String> {
        lflags.iter().map(|f| format!("-L{f}")).collect()
    }

    fn version(&self, _binary: &Path, _verbose_output: &str) -> Result<String> {
        Ok("fakec 1.0.0".to_string())
    }
}

/// A clock pinned to a fixed instant/time, advanced explicitly by tests.
pub struct FixedClock {
    start: Mutex<(Instant, SystemTime)>,
}

impl FixedClock {
    pub fn new() -> Self {
        FixedClock {
            start: Mutex::new((Instant::now(), SystemTime::now())),
        }
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Instant {
        self.start.lock().unwrap().0
    }

    fn system_time(&self) -> SystemTime {
        self.start.lock().unwrap().1
    }
}
