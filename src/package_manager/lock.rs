// src/package_manager/lock.rs

//! Per-(name,version) exclusive/shared file locks so concurrent `dub`
//! processes can fetch and read the package cache without corrupting it.
//! Adapted from the daemon-lifetime `flock` pattern used elsewhere in this
//! codebase for single-instance enforcement.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{Error, Result};

pub struct PackageLock {
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl PackageLock {
    pub fn acquire_exclusive<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        file.lock_exclusive().map_err(|e| Error::Lock {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { file, path })
    }

    pub fn acquire_shared<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        file.lock_shared().map_err(|e| Error::Lock {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PackageLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}
