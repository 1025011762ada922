use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

fn manifest() -> BuildManifest {
    BuildManifest {
        package: "app".to_string(),
        build_type: "debug".to_string(),
        artifact_file_name: "app".to_string(),
        inputs: vec!["main.d".to_string()],
    }
}

fn id(tag: &str) -> BuildId {
    crate::hash::hash_bytes(tag.as_bytes())
}

#[test]
fn miss_then_hit_after_install() {
    let dir = tempfile::tempdir().unwrap();
    let cache = BuildCache::new(dir.path());
    let build_id = id("a");

    assert!(cache.lookup(&build_id).unwrap().is_none());

    let artifact = cache
        .install(&build_id, manifest(), |tmp| {
            std::fs::write(tmp.join("app"), b"compiled")?;
            Ok(())
        })
        .unwrap();
    assert!(artifact.is_file());
    assert_eq!(std::fs::read(&artifact).unwrap(), b"compiled");

    let hit = cache.lookup(&build_id).unwrap().unwrap();
    assert_eq!(hit, artifact);
}

#[test]
fn failed_compile_leaves_no_partial_directory() {
    let dir = tempfile::tempdir().unwrap();
    let cache = BuildCache::new(dir.path());
    let build_id = id("b");

    let err = cache.install(&build_id, manifest(), |_tmp| {
        Err(crate::error::Error::Compile {
            target: "app".to_string(),
            exit_code: Some(1),
            stderr: "boom".to_string(),
        })
    });
    assert!(err.is_err());
    assert!(cache.lookup(&build_id).unwrap().is_none());
    assert!(!dir.path().join(".dub/build").join(build_id.to_string()).exists());
}

#[test]
fn concurrent_builders_produce_exactly_one_compile_invocation() {
    let dir = tempfile::tempdir().unwrap();
    let cache = std::sync::Arc::new(BuildCache::new(dir.path()));
    let build_id = id("c");
    let invocations = std::sync::Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = cache.clone();
            let invocations = invocations.clone();
            let build_id = build_id;
            std::thread::spawn(move || {
                cache
                    .install(&build_id, manifest(), |tmp| {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(10));
                        std::fs::write(tmp.join("app"), b"compiled")?;
                        Ok(())
                    })
                    .unwrap()
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
}

#[test]
fn gc_removes_directories_not_in_keep_set() {
    let dir = tempfile::tempdir().unwrap();
    let cache = BuildCache::new(dir.path());
    let keep_id = id("keep");
    let stale_id = id("stale");

    for i in [&keep_id, &stale_id] {
        cache
            .install(i, manifest(), |tmp| {
                std::fs::write(tmp.join("app"), b"x")?;
                Ok(())
            })
            .unwrap();
    }

    let mut keep = std::collections::HashSet::new();
    keep.insert(keep_id);
    let removed = cache.gc(&keep).unwrap();
    assert_eq!(removed, 1);
    assert!(cache.lookup(&keep_id).unwrap().is_some());
    assert!(cache.lookup(&stale_id).unwrap().is_none());
}
