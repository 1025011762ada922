// src/recipe/format/mod.rs

//! Two textual back-ends that both produce the neutral [`super::model::Recipe`].
//!
//! `spec.md` treats the concrete recipe grammar as out of scope ("the
//! concrete recipe file formats (treated as an injectable parser yielding
//! the neutral recipe model of §3)"); the `RecipeFormat` trait is the seam
//! an embedder plugs a real grammar into. Two reference back-ends are
//! provided so the core has something to round-trip against in tests: an
//! S-expression-like format (`sdl`) and a JSON-like format (`json`).

mod json;
mod sdl;

use crate::error::Result;
use super::model::Recipe;

/// An injectable recipe-text parser. The core never depends on a concrete
/// grammar; it only depends on this trait.
pub trait RecipeFormat {
    fn parse(&self, source: &str, file: &std::path::Path) -> Result<Recipe>;
}

pub use json::{parse_recipe_json, JsonRecipeFormat};
pub use sdl::{parse_recipe_sdl, SdlRecipeFormat};
