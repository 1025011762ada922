use crate::interfaces::PackageSupplier;
use crate::package_manager::PackageManager;
use crate::recipe::{
    BuildSettings, Configuration, Dependency, PackageName, Platform, PlatformPredicate, Recipe,
    SubpackageRef, TargetType,
};
use crate::resolver::Resolution;
use crate::version::{Constraint, VersionId};

use super::ProjectBuilder;

fn write_recipe(dir: &std::path::Path, json: &str) {
    std::fs::write(dir.join("dub.json"), json).unwrap();
}

fn configuration(name: &str, target_type: TargetType, settings: BuildSettings) -> Configuration {
    Configuration {
        name: name.to_string(),
        target_type,
        platforms: Vec::new(),
        settings: vec![(PlatformPredicate::any(), settings)],
    }
}

fn settings_with_import_path(path: &str) -> BuildSettings {
    BuildSettings {
        import_paths: vec![path.to_string()],
        ..Default::default()
    }
}

fn no_suppliers() -> Vec<Box<dyn PackageSupplier>> {
    Vec::new()
}

#[test]
fn merges_a_static_library_dependencys_import_paths_but_not_its_libs() {
    let lib_dir = tempfile::tempdir().unwrap();
    write_recipe(
        lib_dir.path(),
        r#"{
            "name": "a",
            "targetType": "staticLibrary",
            "importPaths": ["a/source"],
            "libs": ["a-native"]
        }"#,
    );

    let mut root = Recipe::new(PackageName::new("root"));
    root.configurations
        .push(configuration("application", TargetType::Executable, BuildSettings::default()));
    root.dependencies
        .push(Dependency::new(PackageName::new("a"), Constraint::parse(">=1.0.0").unwrap()));

    let mut resolution = Resolution::default();
    resolution.insert(PackageName::new("a"), VersionId::path(lib_dir.path()));

    let (user, system) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
    let manager = PackageManager::new(user.path().to_path_buf(), system.path().to_path_buf());
    let root_dir = tempfile::tempdir().unwrap();
    let suppliers = no_suppliers();
    let builder = ProjectBuilder::new(&manager, &suppliers, Platform::host());

    let project = builder.build(&root, root_dir.path(), &resolution, None).unwrap();

    let a = project.package(&PackageName::new("a")).unwrap();
    assert_eq!(a.target_type, TargetType::StaticLibrary);

    assert_eq!(project.root.settings.import_paths, vec!["a/source".to_string()]);
    assert!(project.root.settings.libs.is_empty());
}

#[test]
fn source_library_dependency_contributes_full_settings_minus_link_inputs() {
    let lib_dir = tempfile::tempdir().unwrap();
    write_recipe(
        lib_dir.path(),
        r#"{
            "name": "b",
            "targetType": "sourceLibrary",
            "importPaths": ["b/source"],
            "sourceFiles": ["b/source/b.d"],
            "libs": ["b-native"]
        }"#,
    );

    let mut root = Recipe::new(PackageName::new("root"));
    root.configurations
        .push(configuration("application", TargetType::Executable, BuildSettings::default()));
    root.dependencies
        .push(Dependency::new(PackageName::new("b"), Constraint::parse(">=1.0.0").unwrap()));

    let mut resolution = Resolution::default();
    resolution.insert(PackageName::new("b"), VersionId::path(lib_dir.path()));

    let (user, system) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
    let manager = PackageManager::new(user.path().to_path_buf(), system.path().to_path_buf());
    let root_dir = tempfile::tempdir().unwrap();
    let suppliers = no_suppliers();
    let builder = ProjectBuilder::new(&manager, &suppliers, Platform::host());

    let project = builder.build(&root, root_dir.path(), &resolution, None).unwrap();

    assert_eq!(
        project.root.settings.import_paths,
        vec!["b/source".to_string()]
    );
    assert_eq!(project.root.settings.source_files, vec!["b/source/b.d".to_string()]);
    assert!(project.root.settings.libs.is_empty());
}

#[test]
fn optional_dependency_missing_from_the_resolution_is_skipped() {
    let mut root = Recipe::new(PackageName::new("root"));
    root.configurations
        .push(configuration("application", TargetType::Executable, BuildSettings::default()));
    let mut dep = Dependency::new(PackageName::new("a"), Constraint::parse(">=1.0.0").unwrap());
    dep.optional = true;
    root.dependencies.push(dep);

    let resolution = Resolution::default();
    let (user, system) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
    let manager = PackageManager::new(user.path().to_path_buf(), system.path().to_path_buf());
    let root_dir = tempfile::tempdir().unwrap();
    let suppliers = no_suppliers();
    let builder = ProjectBuilder::new(&manager, &suppliers, Platform::host());

    let project = builder.build(&root, root_dir.path(), &resolution, None).unwrap();
    assert!(project.package(&PackageName::new("a")).is_none());
    assert!(project.root.dependencies.is_empty());
}

#[test]
fn non_optional_dependency_missing_from_the_resolution_is_an_error() {
    let mut root = Recipe::new(PackageName::new("root"));
    root.configurations
        .push(configuration("application", TargetType::Executable, BuildSettings::default()));
    root.dependencies
        .push(Dependency::new(PackageName::new("a"), Constraint::parse(">=1.0.0").unwrap()));

    let resolution = Resolution::default();
    let (user, system) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
    let manager = PackageManager::new(user.path().to_path_buf(), system.path().to_path_buf());
    let root_dir = tempfile::tempdir().unwrap();
    let suppliers = no_suppliers();
    let builder = ProjectBuilder::new(&manager, &suppliers, Platform::host());

    let err = builder.build(&root, root_dir.path(), &resolution, None).unwrap_err();
    assert!(matches!(err, crate::error::Error::PackageNotFound { .. }));
}

#[test]
fn bare_colon_dependency_resolves_the_enclosing_recipes_own_subpackage() {
    let mut sub = Recipe::new(PackageName::new("sub"));
    sub.configurations
        .push(configuration("library", TargetType::StaticLibrary, settings_with_import_path("sub/source")));

    let mut root = Recipe::new(PackageName::new("root"));
    root.configurations
        .push(configuration("application", TargetType::Executable, BuildSettings::default()));
    root.subpackages.push(SubpackageRef::Inline(Box::new(sub)));
    root.dependencies
        .push(Dependency::new(PackageName::new(":sub"), Constraint::Any));

    let resolution = Resolution::default();
    let (user, system) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
    let manager = PackageManager::new(user.path().to_path_buf(), system.path().to_path_buf());
    let root_dir = tempfile::tempdir().unwrap();
    let suppliers = no_suppliers();
    let builder = ProjectBuilder::new(&manager, &suppliers, Platform::host());

    let project = builder.build(&root, root_dir.path(), &resolution, None).unwrap();

    let qualified = PackageName::new("root:sub");
    let sub_pkg = project.packages.get(&qualified).expect("subpackage present");
    assert_eq!(sub_pkg.target_type, TargetType::StaticLibrary);
    assert_eq!(project.root.settings.import_paths, vec!["sub/source".to_string()]);
}

#[test]
fn subconfiguration_pin_selects_a_non_default_configuration() {
    let dep_dir = tempfile::tempdir().unwrap();
    write_recipe(dep_dir.path(), r#"{"name": "a", "targetType": "library"}"#);

    let mut root = Recipe::new(PackageName::new("root"));
    root.configurations
        .push(configuration("application", TargetType::Executable, BuildSettings::default()));
    let mut dep = Dependency::new(PackageName::new("a"), Constraint::parse(">=1.0.0").unwrap());
    dep.sub_configuration = Some("special".to_string());
    root.dependencies.push(dep);

    let mut resolution = Resolution::default();
    resolution.insert(PackageName::new("a"), VersionId::path(dep_dir.path()));

    let (user, system) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
    let manager = PackageManager::new(user.path().to_path_buf(), system.path().to_path_buf());
    let root_dir = tempfile::tempdir().unwrap();
    let suppliers = no_suppliers();
    let builder = ProjectBuilder::new(&manager, &suppliers, Platform::host());

    // The on-disk fixture only has one (default) configuration named
    // "library", so pinning a configuration that does not exist on it
    // must surface as a `PackageNotFound`, proving the pin is honored
    // rather than silently falling back to the default.
    let err = builder.build(&root, root_dir.path(), &resolution, None).unwrap_err();
    assert!(matches!(err, crate::error::Error::PackageNotFound { .. }));
}
