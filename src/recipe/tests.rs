// src/recipe/tests.rs

use super::*;
use std::path::Path;

#[test]
fn json_backend_parses_dependencies_and_configs() {
    let src = r#"{
        "name": "demo",
        "version": "1.0.0",
        "targetType": "executable",
        "dependencies": {
            "vibe-core": "~>1.0",
            "fixed-lib": { "version": "==2.0.0", "optional": true }
        },
        "configurations": [
            { "name": "unittest", "targetType": "executable", "sourceFiles": ["tests/main.d"] }
        ]
    }"#;
    let recipe = parse_recipe_json(src, Path::new("dub.json")).unwrap();
    assert_eq!(recipe.name.0, "demo");
    assert_eq!(recipe.dependencies.len(), 2);
    let fixed = recipe.dependency("fixed-lib").unwrap();
    assert!(fixed.optional);
    assert_eq!(recipe.configurations.len(), 2);
}

#[test]
fn sdl_backend_parses_nested_configuration_block() {
    let src = r#"
        name "demo"
        version "1.0.0"
        targetType "library"
        dependency "vibe-core" version="~>1.0"

        configuration "unittest" {
            targetType "executable"
            sourceFiles "tests/main.d"
        }

        buildType "release" {
            dflags "-release"
        }
    "#;
    let recipe = parse_recipe_sdl(src, Path::new("dub.sdl")).unwrap();
    assert_eq!(recipe.name.0, "demo");
    assert_eq!(recipe.dependencies.len(), 1);
    assert_eq!(recipe.configurations.len(), 2);
    let unittest = recipe.configurations.iter().find(|c| c.name == "unittest").unwrap();
    assert_eq!(unittest.target_type, TargetType::Executable);
    assert!(recipe.build_types.contains_key("release"));
}

#[test]
fn configuration_selection_falls_back_to_first_matching_platform() {
    let platform = Platform::new("linux", "x86_64", "dmd");
    let mut recipe = Recipe::new(PackageName::new("demo"));
    recipe.configurations.push(Configuration {
        name: "windows-only".to_string(),
        target_type: TargetType::Executable,
        platforms: vec![PlatformPredicate::parse("windows")],
        settings: Vec::new(),
    });
    recipe.configurations.push(Configuration {
        name: "posix".to_string(),
        target_type: TargetType::Executable,
        platforms: vec![PlatformPredicate::parse("linux")],
        settings: Vec::new(),
    });
    let chosen = recipe.select_configuration(&platform, None).unwrap();
    assert_eq!(chosen.name, "posix");
}

#[test]
fn configuration_selection_honors_explicit_name() {
    let platform = Platform::new("linux", "x86_64", "dmd");
    let mut recipe = Recipe::new(PackageName::new("demo"));
    recipe.configurations.push(Configuration {
        name: "a".to_string(),
        target_type: TargetType::Executable,
        platforms: Vec::new(),
        settings: Vec::new(),
    });
    recipe.configurations.push(Configuration {
        name: "b".to_string(),
        target_type: TargetType::Library,
        platforms: Vec::new(),
        settings: Vec::new(),
    });
    let chosen = recipe.select_configuration(&platform, Some("b")).unwrap();
    assert_eq!(chosen.name, "b");
}

#[test]
fn build_settings_merge_preserves_flag_order_without_dedup() {
    let mut a = BuildSettings {
        dflags: vec!["-a".into(), "-b".into()],
        ..Default::default()
    };
    let b = BuildSettings {
        dflags: vec!["-b".into(), "-c".into()],
        ..Default::default()
    };
    a.merge(&b, false);
    assert_eq!(a.dflags, vec!["-a", "-b", "-b", "-c"]);
}

#[test]
fn build_settings_merge_dedups_non_flag_arrays() {
    let mut a = BuildSettings {
        import_paths: vec!["source".into()],
        ..Default::default()
    };
    let b = BuildSettings {
        import_paths: vec!["source".into(), "views".into()],
        ..Default::default()
    };
    a.merge(&b, false);
    assert_eq!(a.import_paths, vec!["source", "views"]);
}

#[test]
fn build_settings_prepend_variant_orders_dependency_flags_first() {
    let mut a = BuildSettings {
        lflags: vec!["-lconsumer".into()],
        ..Default::default()
    };
    let dep = BuildSettings {
        lflags: vec!["-ldep".into()],
        ..Default::default()
    };
    a.merge(&dep, true);
    assert_eq!(a.lflags, vec!["-ldep", "-lconsumer"]);
}

#[test]
fn expand_source_globs_resolves_patterns_to_sorted_relative_paths() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("source")).unwrap();
    std::fs::write(dir.path().join("source/b.d"), "").unwrap();
    std::fs::write(dir.path().join("source/a.d"), "").unwrap();
    std::fs::write(dir.path().join("source/skip.txt"), "").unwrap();

    let mut settings = BuildSettings {
        source_files: vec!["source/*.d".to_string(), "main.d".to_string()],
        ..Default::default()
    };
    settings.expand_source_globs(dir.path());
    assert_eq!(
        settings.source_files,
        vec!["source/a.d".to_string(), "source/b.d".to_string(), "main.d".to_string()]
    );
}

#[test]
fn expand_source_globs_leaves_literal_paths_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = BuildSettings {
        source_files: vec!["source/app.d".to_string()],
        ..Default::default()
    };
    settings.expand_source_globs(dir.path());
    assert_eq!(settings.source_files, vec!["source/app.d".to_string()]);
}
