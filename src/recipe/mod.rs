// src/recipe/mod.rs

//! The neutral recipe model (C2): an in-memory representation of a
//! package's metadata, configurations, and per-platform build settings,
//! produced by either of two textual back-ends (`format::sdl`,
//! `format::json`) or constructed directly by embedders.
//!
//! # Package naming
//!
//! Following the culinary-adjacent vocabulary of the build-tool domain, a
//! recipe here plays the role the spec calls "Recipe": name, version,
//! configurations, subpackages, dependencies, build-type presets, and tool
//! requirements.

mod format;
mod model;
mod platform;
mod settings;

pub use format::{parse_recipe_json, parse_recipe_sdl, RecipeFormat};
pub use model::{Configuration, Dependency, PackageName, Recipe, SubpackageRef, TargetType, ToolRequirements};
pub use platform::{Platform, PlatformPredicate};
pub use settings::{BuildSettings, HookCommand};

#[cfg(test)]
mod tests;
