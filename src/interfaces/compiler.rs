// src/interfaces/compiler.rs

//! `Compiler`: the injectable compiler driver. The platform probe
//! (`determine_platform`) is expected to compile a small source fragment
//! whose `pragma(msg)`-style output is parsed between a fixed BEGIN/END
//! marker, yielding the platform/architecture/compiler identity used by
//! both `BuildSettings` platform filtering and the build-id hash.

use std::path::Path;

use crate::error::Result;
use crate::recipe::BuildSettings;

/// The result of probing a compiler binary: everything about its identity
/// that feeds platform filtering and the build-id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildPlatform {
    pub os: Vec<String>,
    pub architecture: Vec<String>,
    pub compiler_name: String,
    pub frontend_version: String,
    pub vendor: String,
}

impl BuildPlatform {
    pub fn primary_os(&self) -> &str {
        self.os.first().map(|s| s.as_str()).unwrap_or("unknown")
    }

    pub fn primary_arch(&self) -> &str {
        self.architecture.first().map(|s| s.as_str()).unwrap_or("unknown")
    }
}

/// Captured stdout/stderr/exit status of a compile or link invocation, for
/// diagnostic surfacing on failure.
#[derive(Debug, Clone, Default)]
pub struct InvocationOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl InvocationOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Bit flags normalized from / lowered to compiler-specific command-line
/// flags by `prepare_build_settings`/`extract_build_options`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions(pub u32);

pub const OPT_DEBUG_INFO: u32 = 1 << 0;
pub const OPT_WARNINGS_AS_ERRORS: u32 = 1 << 1;
pub const OPT_OPTIMIZE: u32 = 1 << 2;
pub const OPT_COVERAGE: u32 = 1 << 3;
pub const OPT_UNITTESTS: u32 = 1 << 4;
pub const OPT_NO_BOUNDS_CHECK: u32 = 1 << 5;

pub trait Compiler: Send + Sync {
    fn name(&self) -> &str;

    /// Probe `binary` (falling back to `arch_override` when the probe
    /// cannot determine architecture on its own) for its platform identity.
    fn determine_platform(
        &self,
        settings: &BuildSettings,
        binary: &Path,
        arch_override: Option<&str>,
    ) -> Result<BuildPlatform>;

    /// Lower high-level settings into compiler-specific flags, restricted
    /// to `included_fields` when given (used to avoid re-lowering fields a
    /// caller has already finalized).
    fn prepare_build_settings(
        &self,
        settings: &mut BuildSettings,
        platform: &BuildPlatform,
        included_fields: Option<&[&str]>,
    ) -> Result<()>;

    /// Normalize command-line flags already present in `settings` back
    /// into `BuildOptions` bits (the inverse of `prepare_build_settings`'s
    /// option lowering).
    fn extract_build_options(&self, settings: &mut BuildSettings) -> BuildOptions;

    fn target_file_name(&self, settings: &BuildSettings, platform: &BuildPlatform) -> String;

    fn set_target(&self, settings: &mut BuildSettings, platform: &BuildPlatform, path: Option<&Path>);

    fn invoke(&self, settings: &BuildSettings, platform: &BuildPlatform) -> Result<InvocationOutput>;

    fn invoke_linker(
        &self,
        settings: &BuildSettings,
        platform: &BuildPlatform,
        objects: &[std::path::PathBuf],
    ) -> Result<InvocationOutput>;

    /// Translate linker flags into the equivalent `-L`-style compiler
    /// driver flags for compilers that link through the compiler front end.
    fn lflags_to_dflags(&self, lflags: &[String]) -> Vec<String>;

    fn version(&self, binary: &Path, verbose_output: &str) -> Result<String>;
}
