// src/recipe/format/json.rs

//! JSON-like recipe back-end (the `dub.json` style of grammar).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::version::{Constraint, VersionId};

use super::super::model::{
    Configuration, Dependency, PackageName, Recipe, SubpackageRef, TargetType, ToolRequirements,
};
use super::super::platform::PlatformPredicate;
use super::super::settings::BuildSettings;
use super::RecipeFormat;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct JsonDependency {
    version: Option<String>,
    optional: bool,
    default: bool,
    path: Option<String>,
    #[serde(rename = "subConfiguration")]
    sub_configuration: Option<String>,
    features: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct JsonSettings {
    versions: Vec<String>,
    #[serde(rename = "importPaths")]
    import_paths: Vec<String>,
    #[serde(rename = "stringImportPaths")]
    string_import_paths: Vec<String>,
    #[serde(rename = "sourceFiles")]
    source_files: Vec<String>,
    #[serde(rename = "excludedSourceFiles")]
    excluded_source_files: Vec<String>,
    dflags: Vec<String>,
    lflags: Vec<String>,
    cflags: Vec<String>,
    libs: Vec<String>,
    #[serde(rename = "copyFiles")]
    copy_files: Vec<String>,
    environments: HashMap<String, String>,
}

impl From<JsonSettings> for BuildSettings {
    fn from(s: JsonSettings) -> Self {
        BuildSettings {
            versions: s.versions,
            import_paths: s.import_paths,
            string_import_paths: s.string_import_paths,
            source_files: s.source_files,
            excluded_source_files: s.excluded_source_files,
            dflags: s.dflags,
            lflags: s.lflags,
            cflags: s.cflags,
            libs: s.libs,
            copy_files: s.copy_files,
            environments: s.environments,
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct JsonConfiguration {
    name: String,
    #[serde(rename = "targetType")]
    target_type: Option<String>,
    platforms: Vec<String>,
    #[serde(flatten)]
    settings: JsonSettings,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct JsonRecipe {
    name: String,
    version: Option<String>,
    #[serde(rename = "targetType")]
    target_type: Option<String>,
    dependencies: HashMap<String, JsonValueOrObject>,
    configurations: Vec<JsonConfiguration>,
    subpackages: Vec<serde_json::Value>,
    #[serde(rename = "buildTypes")]
    build_types: HashMap<String, JsonSettings>,
    #[serde(flatten)]
    settings: JsonSettings,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonValueOrObject {
    Version(String),
    Object(JsonDependency),
}

fn target_type_from_str(s: &str) -> TargetType {
    match s {
        "executable" => TargetType::Executable,
        "staticLibrary" => TargetType::StaticLibrary,
        "dynamicLibrary" => TargetType::DynamicLibrary,
        "sourceLibrary" => TargetType::SourceLibrary,
        "object" => TargetType::Object,
        "none" => TargetType::None,
        _ => TargetType::Library,
    }
}

fn parse_dependency(name: &str, value: JsonValueOrObject) -> Result<Dependency> {
    let (constraint, dep) = match value {
        JsonValueOrObject::Version(v) => (
            Constraint::parse(&v).map_err(|e| Error::RecipeParse {
                file: PathBuf::new(),
                line: 0,
                message: format!("invalid constraint for '{name}': {e}"),
            })?,
            JsonDependency::default(),
        ),
        JsonValueOrObject::Object(obj) => {
            let c = match &obj.version {
                Some(v) => Constraint::parse(v).map_err(|e| Error::RecipeParse {
                    file: PathBuf::new(),
                    line: 0,
                    message: format!("invalid constraint for '{name}': {e}"),
                })?,
                None => Constraint::Any,
            };
            (c, obj)
        }
    };

    let mut d = Dependency::new(PackageName::new(name), constraint);
    d.optional = dep.optional;
    d.default = dep.default;
    d.path = dep.path.map(PathBuf::from);
    d.sub_configuration = dep.sub_configuration;
    d.features = dep.features;
    if d.path.is_some() {
        d.constraint = Constraint::path(d.path.clone().unwrap());
    }
    Ok(d)
}

fn parse_version(v: &str) -> Result<VersionId> {
    if let Some(branch) = v.strip_prefix('~') {
        return Ok(VersionId::branch(branch));
    }
    semver::Version::parse(v)
        .map(VersionId::Release)
        .map_err(|e| Error::RecipeParse {
            file: PathBuf::new(),
            line: 0,
            message: format!("invalid version '{v}': {e}"),
        })
}

pub struct JsonRecipeFormat;

impl RecipeFormat for JsonRecipeFormat {
    fn parse(&self, source: &str, file: &Path) -> Result<Recipe> {
        let parsed: JsonRecipe = serde_json::from_str(source).map_err(|e| Error::RecipeParse {
            file: file.to_path_buf(),
            line: e.line() as u32,
            message: e.to_string(),
        })?;

        let mut recipe = Recipe::new(PackageName::new(parsed.name));
        if let Some(v) = parsed.version {
            recipe.version = Some(parse_version(&v)?);
        }

        for (name, value) in parsed.dependencies {
            recipe.dependencies.push(parse_dependency(&name, value)?);
        }
        recipe.dependencies.sort_by(|a, b| a.name.0.cmp(&b.name.0));

        let root_target = parsed
            .target_type
            .as_deref()
            .map(target_type_from_str)
            .unwrap_or(TargetType::Executable);
        let root_settings: BuildSettings = parsed.settings.into();
        recipe.configurations.push(Configuration {
            name: "library".to_string(),
            target_type: root_target,
            platforms: Vec::new(),
            settings: vec![(PlatformPredicate::any(), root_settings)],
        });

        for cfg in parsed.configurations {
            let platforms = cfg
                .platforms
                .iter()
                .map(|p| PlatformPredicate::parse(p))
                .collect::<Vec<_>>();
            recipe.configurations.push(Configuration {
                name: cfg.name,
                target_type: cfg
                    .target_type
                    .as_deref()
                    .map(target_type_from_str)
                    .unwrap_or(root_target),
                platforms: platforms.clone(),
                settings: vec![(
                    platforms.first().cloned().unwrap_or_else(PlatformPredicate::any),
                    cfg.settings.into(),
                )],
            });
        }

        for (name, settings) in parsed.build_types {
            recipe.build_types.insert(name, settings.into());
        }

        for sub in parsed.subpackages {
            if let Some(path) = sub.as_str() {
                recipe.subpackages.push(SubpackageRef::Path(PathBuf::from(path)));
            } else {
                let inline: JsonRecipe = serde_json::from_value(sub).map_err(|e| Error::RecipeParse {
                    file: file.to_path_buf(),
                    line: 0,
                    message: e.to_string(),
                })?;
                let mut sub_recipe = Recipe::new(PackageName::new(inline.name.clone()));
                if let Some(v) = &inline.version {
                    sub_recipe.version = Some(parse_version(v)?);
                }
                for (name, value) in inline.dependencies {
                    sub_recipe.dependencies.push(parse_dependency(&name, value)?);
                }
                let settings: BuildSettings = inline.settings.into();
                sub_recipe.configurations.push(Configuration {
                    name: "library".to_string(),
                    target_type: inline
                        .target_type
                        .as_deref()
                        .map(target_type_from_str)
                        .unwrap_or(TargetType::Library),
                    platforms: Vec::new(),
                    settings: vec![(PlatformPredicate::any(), settings)],
                });
                recipe.subpackages.push(SubpackageRef::Inline(Box::new(sub_recipe)));
            }
        }

        Ok(recipe)
    }
}

pub fn parse_recipe_json(source: &str, file: &Path) -> Result<Recipe> {
    JsonRecipeFormat.parse(source, file)
}

/// Serialize a neutral recipe back to the JSON-like shape, used by the
/// `describe` generator (§SPEC_FULL G) as well as by tests that round-trip
/// a recipe through this back-end.
pub fn to_json_value(recipe: &Recipe, tool_requirements: &ToolRequirements) -> serde_json::Value {
    let _ = tool_requirements;
    serde_json::json!({
        "name": recipe.name.0,
        "version": recipe.version.as_ref().map(|v| v.to_string()),
        "configurations": recipe.configurations.iter().map(|c| c.name.clone()).collect::<Vec<_>>(),
    })
}
