// src/interfaces/package_supplier.rs

//! `PackageSupplier`: an injectable source of recipes and archives for
//! non-local versions. Implementations are expected to be idempotent and
//! safe to call concurrently (`spec.md` §6); the core issues parallel
//! `list_versions` calls across independent suppliers.

use crate::error::Result;
use crate::recipe::Recipe;
use crate::version::VersionId;

pub trait PackageSupplier: Send + Sync {
    fn list_versions(&self, name: &str) -> Result<Vec<VersionId>>;
    fn fetch_recipe(&self, name: &str, version: &VersionId) -> Result<Recipe>;
    fn fetch_archive(&self, name: &str, version: &VersionId) -> Result<Vec<u8>>;
    fn describe(&self) -> String;
}

/// Extract a fetched archive into `dest`. The concrete archive format is
/// out of scope (`spec.md` §1); this accepts the degenerate "archive is a
/// directory serialized as `path\0contents` records" layout the in-memory
/// test supplier produces, which is sufficient to exercise the fetch path
/// end to end without a real compression/transport dependency.
pub fn extract_archive(archive: &[u8], dest: &std::path::Path) -> Result<()> {
    let mut offset = 0;
    while offset < archive.len() {
        let nul = archive[offset..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| crate::error::Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "malformed archive: missing path terminator",
            )))?;
        let path_str = std::str::from_utf8(&archive[offset..offset + nul])
            .map_err(|e| crate::error::Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        offset += nul + 1;
        let len = u32::from_le_bytes(archive[offset..offset + 4].try_into().unwrap()) as usize;
        offset += 4;
        let contents = &archive[offset..offset + len];
        offset += len;

        let target = dest.join(path_str);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(target, contents)?;
    }
    Ok(())
}
