// src/recipe/model.rs

//! The neutral `Recipe` type and its constituent parts.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::version::Constraint;

use super::platform::{Platform, PlatformPredicate};
use super::settings::BuildSettings;

/// A lower-case, dot-separated package name, e.g. `vibe.d`. A subpackage is
/// addressed as `parent:child`; a bare `:child` from within the parent's own
/// recipe refers to the enclosing package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageName(pub String);

impl PackageName {
    pub fn new(s: impl Into<String>) -> Self {
        PackageName(s.into())
    }

    /// Split `parent:child` into its parts; a name with no colon has no
    /// parent part.
    pub fn split_subpackage(&self) -> (Option<&str>, &str) {
        match self.0.split_once(':') {
            Some((parent, child)) => (Some(parent), child),
            None => (None, self.0.as_str()),
        }
    }

    pub fn is_subpackage_reference(&self) -> bool {
        self.0.contains(':')
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetType {
    Executable,
    Library,
    StaticLibrary,
    DynamicLibrary,
    SourceLibrary,
    Object,
    None,
}

impl TargetType {
    /// Whether this target type contributes a link input to dependents
    /// (an object a linker consumes), as opposed to only contributing
    /// sources/import paths (`SourceLibrary`) or nothing (`None`).
    pub fn is_linkable(&self) -> bool {
        matches!(
            self,
            TargetType::StaticLibrary | TargetType::DynamicLibrary | TargetType::Library
        )
    }

    pub fn produces_target(&self) -> bool {
        !matches!(self, TargetType::None | TargetType::SourceLibrary)
    }
}

/// One named variant within a recipe: selects a target type and carries
/// platform-filtered build settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub name: String,
    pub target_type: TargetType,
    /// Platform filter; `None` (the default "any") always matches. The
    /// first configuration whose filter matches, in declaration order, is
    /// selected when the caller does not name one explicitly.
    pub platforms: Vec<PlatformPredicate>,
    /// Build settings paired with the predicate that gates them; a clause
    /// with `PlatformPredicate::any()` always applies.
    pub settings: Vec<(PlatformPredicate, BuildSettings)>,
}

impl Configuration {
    pub fn matches_platform(&self, platform: &Platform) -> bool {
        self.platforms.is_empty() || self.platforms.iter().any(|p| p.matches(platform))
    }

    /// Merge every settings clause whose predicate matches `platform`, in
    /// declaration order, into one `BuildSettings`.
    pub fn merged_settings(&self, platform: &Platform) -> BuildSettings {
        let mut merged = BuildSettings::default();
        for (pred, settings) in &self.settings {
            if pred.matches(platform) {
                merged.merge(settings, false);
            }
        }
        merged
    }
}

/// A subpackage may be declared inline or referenced by a path to its own
/// recipe file.
#[derive(Debug, Clone, PartialEq)]
pub enum SubpackageRef {
    Inline(Box<Recipe>),
    Path(PathBuf),
}

/// One dependency declaration: a constraint plus the per-dependency
/// options `spec.md` §3 lists.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub name: PackageName,
    pub constraint: Constraint,
    pub optional: bool,
    /// Only meaningful when `optional` is set: whether the root recipe
    /// opts this dependency in by default.
    pub default: bool,
    pub path: Option<PathBuf>,
    pub sub_configuration: Option<String>,
    pub features: Vec<String>,
}

impl Dependency {
    pub fn new(name: PackageName, constraint: Constraint) -> Self {
        Dependency {
            name,
            constraint,
            optional: false,
            default: false,
            path: None,
            sub_configuration: None,
            features: Vec::new(),
        }
    }
}

/// Per-compiler/tool version requirements declared under `toolchainRequirements`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolRequirements {
    pub dub: Option<Constraint>,
    pub compilers: HashMap<String, Constraint>,
}

/// The neutral in-memory description of a package.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub name: PackageName,
    /// `None` for a path-based or branch-pinned package whose version is
    /// not self-declared (the version lives in the selection, not the recipe).
    pub version: Option<crate::version::VersionId>,
    pub configurations: Vec<Configuration>,
    pub subpackages: Vec<SubpackageRef>,
    /// Declaration order is preserved; the resolver intersects constraints
    /// across requesters but iterates dependencies in this order for
    /// determinism when candidate domains tie.
    pub dependencies: Vec<Dependency>,
    pub build_types: HashMap<String, BuildSettings>,
    pub tool_requirements: ToolRequirements,
}

impl Recipe {
    pub fn new(name: PackageName) -> Self {
        Recipe {
            name,
            version: None,
            configurations: Vec::new(),
            subpackages: Vec::new(),
            dependencies: Vec::new(),
            build_types: HashMap::new(),
            tool_requirements: ToolRequirements::default(),
        }
    }

    /// Select a configuration for `platform`: the user-named one if given
    /// and present, otherwise the first whose platform filter matches, in
    /// declaration order. `spec.md` §4.2: a package with no matching
    /// configuration is "not buildable on that platform" (`None` here),
    /// which the caller must tolerate when the package is an
    /// optional/non-selected dependency and must treat as an error
    /// otherwise.
    pub fn select_configuration(
        &self,
        platform: &Platform,
        requested: Option<&str>,
    ) -> Option<&Configuration> {
        if let Some(name) = requested {
            return self.configurations.iter().find(|c| c.name == name);
        }
        self.configurations.iter().find(|c| c.matches_platform(platform))
    }

    pub fn dependency(&self, name: &str) -> Option<&Dependency> {
        self.dependencies.iter().find(|d| d.name.0 == name)
    }
}
