// tests/end_to_end.rs
//
// The six concrete scenarios from `spec.md` §8, run through the real
// pipeline: resolve → fetch → project → target graph → generator.

mod common;

use std::path::Path;

use dub::error::Error;
use dub::package_manager::PackageManager;
use dub::project::ProjectBuilder;
use dub::recipe::{Dependency, PackageName, Platform, Recipe};
use dub::resolver::{resolve, ResolverOptions};
use dub::selection::Selection;
use dub::target::build_target_graph;
use dub::version::{Constraint, VersionId};

use common::{build_pipeline, executable, fake_platform, library, release, run_generator};

fn write_root_source(root_dir: &Path, root: &Recipe) {
    std::fs::create_dir_all(root_dir).unwrap();
    std::fs::write(root_dir.join(format!("{}.d", root.name.0)), "void main() {}").unwrap();
}

#[test]
fn tilde_lowering_picks_highest_within_lowered_range_and_builds() {
    let root = {
        let mut r = executable("root", &[]);
        r.dependencies.push(Dependency::new(
            PackageName::new("a"),
            Constraint::parse("~>1.2").unwrap(),
        ));
        r
    };
    let catalog = ["1.1.9", "1.2.0", "1.2.7", "1.3.0"]
        .into_iter()
        .map(|v| ("a".to_string(), release(v), library("a", &[])));

    let root_dir = tempfile::tempdir().unwrap();
    write_root_source(root_dir.path(), &root);

    let pipeline = build_pipeline(&root, root_dir.path(), catalog, None, ResolverOptions::default()).unwrap();
    assert_eq!(
        pipeline.project.package(&PackageName::new("a")).unwrap().version,
        release("1.2.7")
    );

    let outcome = run_generator(&pipeline, root_dir.path().join("scratch")).unwrap();
    assert!(outcome.artifacts.contains_key(&PackageName::new("root")));
    assert!(outcome.artifacts.contains_key(&PackageName::new("a")));
}

#[test]
fn diamond_with_overlap_picks_highest_in_intersection_and_builds() {
    let root = {
        let mut r = executable("root", &[]);
        r.dependencies.push(Dependency::new(PackageName::new("b"), Constraint::Any));
        r.dependencies.push(Dependency::new(PackageName::new("c"), Constraint::Any));
        r
    };
    let mut catalog = vec![
        ("b".to_string(), release("1.0.0"), library("b", &[("a", ">=1.0.0 <2.0.0")])),
        ("c".to_string(), release("1.0.0"), library("c", &[("a", ">=1.5.0")])),
    ];
    for v in ["1.0.0", "1.5.0", "1.9.0", "2.0.0"] {
        catalog.push(("a".to_string(), release(v), library("a", &[])));
    }

    let root_dir = tempfile::tempdir().unwrap();
    write_root_source(root_dir.path(), &root);

    let pipeline = build_pipeline(&root, root_dir.path(), catalog.into_iter(), None, ResolverOptions::default()).unwrap();
    assert_eq!(
        pipeline.project.package(&PackageName::new("a")).unwrap().version,
        release("1.9.0")
    );

    let outcome = run_generator(&pipeline, root_dir.path().join("scratch")).unwrap();
    assert_eq!(outcome.artifacts.len(), 4, "root + a + b + c each produce an artifact");
}

#[test]
fn diamond_without_overlap_is_a_conflict_before_any_build_is_attempted() {
    let root = {
        let mut r = executable("root", &[]);
        r.dependencies.push(Dependency::new(PackageName::new("b"), Constraint::Any));
        r.dependencies.push(Dependency::new(PackageName::new("c"), Constraint::Any));
        r
    };
    let catalog = vec![
        ("b".to_string(), release("1.0.0"), library("b", &[("a", "==1.0.0")])),
        ("c".to_string(), release("1.0.0"), library("c", &[("a", "==2.0.0")])),
        ("a".to_string(), release("1.0.0"), library("a", &[])),
        ("a".to_string(), release("2.0.0"), library("a", &[])),
    ];

    let root_dir = tempfile::tempdir().unwrap();
    write_root_source(root_dir.path(), &root);

    let err = build_pipeline(&root, root_dir.path(), catalog.into_iter(), None, ResolverOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Conflict { .. }), "{err:?}");
}

#[test]
fn prior_selection_is_honored_over_a_higher_release_end_to_end() {
    let root = {
        let mut r = executable("root", &[]);
        r.dependencies.push(Dependency::new(PackageName::new("x"), Constraint::parse(">=1.0.0").unwrap()));
        r
    };
    let catalog = ["1.0.0", "1.1.0", "1.2.0"]
        .into_iter()
        .map(|v| ("x".to_string(), release(v), library("x", &[])));

    let mut prior = Selection::new();
    prior.set(PackageName::new("x"), release("1.0.0"));

    let root_dir = tempfile::tempdir().unwrap();
    write_root_source(root_dir.path(), &root);

    let pipeline = build_pipeline(&root, root_dir.path(), catalog, Some(&prior), ResolverOptions::default()).unwrap();
    assert_eq!(
        pipeline.project.package(&PackageName::new("x")).unwrap().version,
        release("1.0.0")
    );
}

#[test]
fn path_override_replaces_an_interval_and_loads_the_recipe_from_disk() {
    let vendor_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        vendor_dir.path().join("dub.json"),
        r#"{"name": "a", "targetType": "library", "sourceFiles": ["a.d"]}"#,
    )
    .unwrap();
    std::fs::write(vendor_dir.path().join("a.d"), "module a;").unwrap();

    let mut root = executable("root", &[]);
    root.dependencies.push(Dependency::new(PackageName::new("a"), Constraint::parse("==1.0.0").unwrap()));

    let (user, system) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
    let mut manager = PackageManager::new(user.path().to_path_buf(), system.path().to_path_buf());
    manager.add_local(PackageName::new("a"), vendor_dir.path().to_path_buf());

    let resolution = resolve(&root, &[], &manager, None, ResolverOptions::default()).unwrap();
    assert_eq!(
        resolution.version_of(&PackageName::new("a")),
        Some(&VersionId::path(vendor_dir.path()))
    );

    let root_dir = tempfile::tempdir().unwrap();
    write_root_source(root_dir.path(), &root);

    let platform = Platform::host();
    let builder = ProjectBuilder::new(&manager, &[], platform);
    let project = builder.build(&root, root_dir.path(), &resolution, None).unwrap();
    let a = project.package(&PackageName::new("a")).unwrap();
    assert_eq!(a.dir, vendor_dir.path().to_path_buf());

    let graph = build_target_graph(&project, "debug").unwrap();
    assert!(graph.get(&PackageName::new("a")).is_some());
}

#[test]
fn a_second_build_with_unchanged_inputs_is_a_cache_hit() {
    let root = executable("root", &[]);
    let root_dir = tempfile::tempdir().unwrap();
    write_root_source(root_dir.path(), &root);

    let pipeline = build_pipeline(&root, root_dir.path(), std::iter::empty(), None, ResolverOptions::default()).unwrap();
    let scratch = root_dir.path().join("scratch");

    let first = run_generator(&pipeline, scratch.clone()).unwrap();
    let artifact = first.artifacts.get(&PackageName::new("root")).unwrap().clone();
    let first_mtime = std::fs::metadata(&artifact).unwrap().modified().unwrap();

    let second = run_generator(&pipeline, scratch).unwrap();
    let same_artifact = second.artifacts.get(&PackageName::new("root")).unwrap();
    assert_eq!(same_artifact, &artifact, "cache hit reuses the exact installed path");
    let second_mtime = std::fs::metadata(same_artifact).unwrap().modified().unwrap();
    assert_eq!(first_mtime, second_mtime, "a cache hit never rewrites the artifact");

    std::fs::write(root_dir.path().join("root.d"), "void main() { /* changed */ }").unwrap();
    let third = run_generator(&pipeline, root_dir.path().join("scratch2")).unwrap();
    let changed_artifact = third.artifacts.get(&PackageName::new("root")).unwrap();
    assert_ne!(changed_artifact, &artifact, "a changed source file is a different build-id");
}

#[test]
fn fake_platform_reports_a_stable_toolchain_identity() {
    let p = fake_platform();
    assert_eq!(p.primary_os(), "linux");
    assert_eq!(p.primary_arch(), "x86_64");
}
