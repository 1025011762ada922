// src/recipe/platform.rs

//! Platform filtering: `(field, set-of-platform-predicates)` pairs applied
//! at `BuildSettings` merge time, replacing the ad-hoc
//! `"sourceFiles-windows-x86_64"` string-suffix convention with a structured
//! predicate evaluated against the target [`Platform`].

use serde::{Deserialize, Serialize};

/// The platform a configuration or build setting is being evaluated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
    pub compiler: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>, compiler: impl Into<String>) -> Self {
        Platform {
            os: os.into(),
            arch: arch.into(),
            compiler: compiler.into(),
        }
    }

    pub fn host() -> Self {
        let os = if cfg!(target_os = "windows") {
            "windows"
        } else if cfg!(target_os = "macos") {
            "osx"
        } else {
            "linux"
        };
        let arch = if cfg!(target_arch = "x86_64") {
            "x86_64"
        } else if cfg!(target_arch = "aarch64") {
            "aarch64"
        } else {
            "unknown"
        };
        Platform::new(os, arch, "unknown")
    }
}

/// One `os-arch-compiler` filter clause; any component left `None` matches
/// every value of that component. A clause matches a `Platform` when every
/// present component matches.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlatformPredicate {
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub compiler: Option<String>,
}

impl PlatformPredicate {
    pub fn any() -> Self {
        PlatformPredicate::default()
    }

    pub fn matches(&self, platform: &Platform) -> bool {
        self.os.as_deref().map(|o| o == platform.os).unwrap_or(true)
            && self.arch.as_deref().map(|a| a == platform.arch).unwrap_or(true)
            && self
                .compiler
                .as_deref()
                .map(|c| c == platform.compiler)
                .unwrap_or(true)
    }

    /// Parse a `dub`-style filter suffix like `windows-x86_64` or
    /// `linux` into a predicate. An empty string is the unconditional
    /// predicate.
    pub fn parse(suffix: &str) -> Self {
        let known_os = ["windows", "linux", "osx", "posix", "freebsd", "openbsd"];
        let known_arch = ["x86_64", "x86", "aarch64", "arm"];
        let mut pred = PlatformPredicate::any();
        for part in suffix.split('-').filter(|s| !s.is_empty()) {
            if known_os.contains(&part) {
                pred.os = Some(part.to_string());
            } else if known_arch.contains(&part) {
                pred.arch = Some(part.to_string());
            } else {
                pred.compiler = Some(part.to_string());
            }
        }
        pred
    }
}
