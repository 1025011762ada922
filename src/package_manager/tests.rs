// src/package_manager/tests.rs

use super::*;
use crate::recipe::PackageName;

#[test]
fn fetched_package_dir_preserves_trailing_name_segment() {
    let root = Path::new("/cache");
    let name = PackageName::new("vibe-d");
    let version = VersionId::Release(semver::Version::parse("1.2.3").unwrap());
    let dir = fetched_package_dir(root, &name, &version);
    assert_eq!(dir, PathBuf::from("/cache/vibe-d/1.2.3/vibe-d"));
}

#[test]
fn path_override_takes_priority_over_cache() {
    let mut pm = PackageManager::new(PathBuf::from("/home/user/.dub"), PathBuf::from("/usr/share/dub"));
    let name = PackageName::new("local-lib");
    pm.add_local(name.clone(), PathBuf::from("/work/local-lib"));
    assert_eq!(pm.path_override(&name), Some(Path::new("/work/local-lib")));
}

#[test]
fn add_local_invalidates_recipe_cache() {
    let mut pm = PackageManager::new(PathBuf::from("/home/user/.dub"), PathBuf::from("/usr/share/dub"));
    let name = PackageName::new("a");
    pm.recipe_cache
        .lock()
        .unwrap()
        .insert((name.clone(), "1.0.0".to_string()), crate::recipe::Recipe::new(name.clone()));
    pm.add_local(name, PathBuf::from("/work/a"));
    assert!(pm.recipe_cache.lock().unwrap().is_empty());
}
