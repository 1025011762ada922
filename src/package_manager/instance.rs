// src/package_manager/instance.rs

//! A package instance is the pair `(name, concrete version-or-pointer)`,
//! plus the on-disk layout convention for the fetched-package cache:
//! `<location>/<name>/<version>/<name>/` — the trailing `<name>` directory
//! preserves the intra-package import path so `import mypkg.foo;` resolves
//! the same way whether the package was fetched or referenced by path.

use std::path::{Path, PathBuf};

use crate::recipe::PackageName;
use crate::version::VersionId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageInstance {
    pub name: PackageName,
    pub version: VersionId,
}

impl PackageInstance {
    pub fn new(name: PackageName, version: VersionId) -> Self {
        PackageInstance { name, version }
    }
}

pub fn fetched_package_dir(root: &Path, name: &PackageName, version: &VersionId) -> PathBuf {
    root.join(&name.0).join(version.to_string()).join(&name.0)
}
