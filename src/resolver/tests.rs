use semver::Version;

use crate::interfaces::testing::FakeSupplier;
use crate::interfaces::PackageSupplier;
use crate::package_manager::PackageManager;
use crate::recipe::{Dependency, PackageName, Recipe};
use crate::selection::Selection;
use crate::version::{Constraint, MergeMode, VersionId};

use super::{resolve, ResolverOptions, UpgradeMode};

fn recipe(name: &str, deps: &[(&str, &str)]) -> Recipe {
    let mut r = Recipe::new(PackageName::new(name));
    for (dep_name, constraint) in deps {
        r.dependencies.push(Dependency::new(
            PackageName::new(*dep_name),
            Constraint::parse(constraint).unwrap(),
        ));
    }
    r
}

fn release(v: &str) -> VersionId {
    VersionId::Release(Version::parse(v).unwrap())
}

fn manager() -> (PackageManager, tempfile::TempDir, tempfile::TempDir) {
    let user = tempfile::tempdir().unwrap();
    let system = tempfile::tempdir().unwrap();
    (
        PackageManager::new(user.path().to_path_buf(), system.path().to_path_buf()),
        user,
        system,
    )
}

fn suppliers(fake: FakeSupplier) -> Vec<Box<dyn PackageSupplier>> {
    vec![Box::new(fake)]
}

#[test]
fn tilde_lowering_picks_highest_within_lowered_range() {
    let root = recipe("root", &[("a", "~>1.2")]);
    let fake = FakeSupplier::new();
    for v in ["1.2.0", "1.2.5", "1.3.0"] {
        fake.add("a", release(v), recipe("a", &[]));
    }
    let (mgr, _u, _s) = manager();
    let resolution = resolve(&root, &suppliers(fake), &mgr, None, ResolverOptions::default()).unwrap();
    assert_eq!(
        resolution.version_of(&PackageName::new("a")),
        Some(&release("1.2.5"))
    );
}

#[test]
fn diamond_with_overlap_picks_highest_in_intersection() {
    let root = recipe("root", &[("b", "*"), ("c", "*")]);
    let fake = FakeSupplier::new();
    fake.add("b", release("1.0.0"), recipe("b", &[("a", ">=1.0.0 <2.0.0")]));
    fake.add("c", release("1.0.0"), recipe("c", &[("a", ">=1.5.0")]));
    for v in ["1.0.0", "1.5.0", "1.9.0", "2.0.0"] {
        fake.add("a", release(v), recipe("a", &[]));
    }
    let (mgr, _u, _s) = manager();
    let resolution = resolve(&root, &suppliers(fake), &mgr, None, ResolverOptions::default()).unwrap();
    assert_eq!(
        resolution.version_of(&PackageName::new("a")),
        Some(&release("1.9.0"))
    );
}

#[test]
fn diamond_without_overlap_is_a_conflict() {
    let root = recipe("root", &[("b", "*"), ("c", "*")]);
    let fake = FakeSupplier::new();
    fake.add("b", release("1.0.0"), recipe("b", &[("a", "==1.0.0")]));
    fake.add("c", release("1.0.0"), recipe("c", &[("a", "==2.0.0")]));
    fake.add("a", release("1.0.0"), recipe("a", &[]));
    fake.add("a", release("2.0.0"), recipe("a", &[]));
    let (mgr, _u, _s) = manager();
    let err = resolve(&root, &suppliers(fake), &mgr, None, ResolverOptions::default()).unwrap_err();
    assert!(matches!(err, crate::error::Error::Conflict { .. }), "{err:?}");
}

#[test]
fn prior_selection_is_honored_over_a_higher_release() {
    let root = recipe("root", &[("a", ">=1.0.0")]);
    let fake = FakeSupplier::new();
    for v in ["1.0.0", "1.1.0", "1.2.0"] {
        fake.add("a", release(v), recipe("a", &[]));
    }
    let mut prior = Selection::new();
    prior.set(PackageName::new("a"), release("1.0.0"));

    let (mgr, _u, _s) = manager();
    let resolution =
        resolve(&root, &suppliers(fake), &mgr, Some(&prior), ResolverOptions::default()).unwrap();
    assert_eq!(
        resolution.version_of(&PackageName::new("a")),
        Some(&release("1.0.0"))
    );
}

#[test]
fn compatible_upgrade_ignores_the_prior_selection() {
    let root = recipe("root", &[("a", ">=1.0.0")]);
    let fake = FakeSupplier::new();
    for v in ["1.0.0", "1.1.0", "1.2.0"] {
        fake.add("a", release(v), recipe("a", &[]));
    }
    let mut prior = Selection::new();
    prior.set(PackageName::new("a"), release("1.0.0"));

    let (mgr, _u, _s) = manager();
    let options = ResolverOptions {
        upgrade: UpgradeMode::Compatible,
        ..ResolverOptions::default()
    };
    let resolution = resolve(&root, &suppliers(fake), &mgr, Some(&prior), options).unwrap();
    assert_eq!(
        resolution.version_of(&PackageName::new("a")),
        Some(&release("1.2.0"))
    );
}

#[test]
fn path_dependency_overrides_an_interval_in_override_merge_mode() {
    let vendor = tempfile::tempdir().unwrap();
    std::fs::write(
        vendor.path().join("dub.json"),
        r#"{"name": "a", "targetType": "library"}"#,
    )
    .unwrap();

    let mut root = recipe("root", &[("c", "*")]);
    root.dependencies.push(Dependency::new(
        PackageName::new("a"),
        Constraint::path(vendor.path()),
    ));

    let fake = FakeSupplier::new();
    fake.add("c", release("1.0.0"), recipe("c", &[("a", ">=1.0.0")]));
    fake.add("a", release("1.0.0"), recipe("a", &[]));

    let (mgr, _u, _s) = manager();
    let options = ResolverOptions {
        upgrade: UpgradeMode::None,
        diamond_merge: MergeMode::PathOrBranchOverridesRange,
    };
    let resolution = resolve(&root, &suppliers(fake), &mgr, None, options).unwrap();
    assert_eq!(
        resolution.version_of(&PackageName::new("a")),
        Some(&VersionId::path(vendor.path()))
    );
}

#[test]
fn optional_dependency_is_omitted_unless_activated() {
    let mut root = recipe("root", &[]);
    let mut dep = Dependency::new(PackageName::new("a"), Constraint::parse(">=1.0.0").unwrap());
    dep.optional = true;
    root.dependencies.push(dep);

    let fake = FakeSupplier::new();
    fake.add("a", release("1.0.0"), recipe("a", &[]));
    let (mgr, _u, _s) = manager();
    let resolution = resolve(&root, &suppliers(fake), &mgr, None, ResolverOptions::default()).unwrap();
    assert!(resolution.version_of(&PackageName::new("a")).is_none());
}

#[test]
fn optional_dependency_activated_by_root_default_flag() {
    let mut root = recipe("root", &[]);
    let mut dep = Dependency::new(PackageName::new("a"), Constraint::parse(">=1.0.0").unwrap());
    dep.optional = true;
    dep.default = true;
    root.dependencies.push(dep);

    let fake = FakeSupplier::new();
    fake.add("a", release("1.0.0"), recipe("a", &[]));
    let (mgr, _u, _s) = manager();
    let resolution = resolve(&root, &suppliers(fake), &mgr, None, ResolverOptions::default()).unwrap();
    assert_eq!(
        resolution.version_of(&PackageName::new("a")),
        Some(&release("1.0.0"))
    );
}

#[test]
fn optional_dependency_activated_by_a_non_optional_requester() {
    // `b` depends on `a` optionally; `d` depends on `a` unconditionally.
    // `a` must be activated because of `d`, even though `b` never opts in.
    let root = recipe("root", &[("b", "*"), ("d", "*")]);
    let mut b = recipe("b", &[]);
    let mut optional_a = Dependency::new(PackageName::new("a"), Constraint::parse(">=1.0.0").unwrap());
    optional_a.optional = true;
    b.dependencies.push(optional_a);

    let fake = FakeSupplier::new();
    fake.add("b", release("1.0.0"), b);
    fake.add("d", release("1.0.0"), recipe("d", &[("a", ">=1.0.0")]));
    fake.add("a", release("1.0.0"), recipe("a", &[]));

    let (mgr, _u, _s) = manager();
    let resolution = resolve(&root, &suppliers(fake), &mgr, None, ResolverOptions::default()).unwrap();
    assert_eq!(
        resolution.version_of(&PackageName::new("a")),
        Some(&release("1.0.0"))
    );
}

#[test]
fn cycle_among_non_path_dependencies_is_reported() {
    let root = recipe("root", &[("a", "*")]);
    let fake = FakeSupplier::new();
    fake.add("a", release("1.0.0"), recipe("a", &[("b", "*")]));
    fake.add("b", release("1.0.0"), recipe("b", &[("a", "*")]));

    let (mgr, _u, _s) = manager();
    let err = resolve(&root, &suppliers(fake), &mgr, None, ResolverOptions::default()).unwrap_err();
    assert!(matches!(err, crate::error::Error::Cycle { .. }), "{err:?}");
}

#[test]
fn subpackage_qualified_dependency_resolves_its_parent() {
    let root = recipe("root", &[("a:sub", ">=1.0.0")]);
    let fake = FakeSupplier::new();
    fake.add("a", release("1.0.0"), recipe("a", &[]));

    let (mgr, _u, _s) = manager();
    let resolution = resolve(&root, &suppliers(fake), &mgr, None, ResolverOptions::default()).unwrap();
    assert_eq!(
        resolution.version_of(&PackageName::new("a")),
        Some(&release("1.0.0"))
    );
    assert!(resolution.version_of(&PackageName::new("a:sub")).is_none());
}
