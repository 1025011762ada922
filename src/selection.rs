// src/selection.rs

//! The selection file (C9): the pinned-version document a resolve writes
//! and a build reads back, so that a build with no new dependencies never
//! re-resolves. One entry per non-root package: a release version, a
//! branch pointer, or a normalized path.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::recipe::PackageName;
use crate::version::VersionId;

const SCHEMA_VERSION: u32 = 1;

/// A loaded or in-progress selection. Ordered by package name so the
/// on-disk document is diff-friendly across resolves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub schema_version: u32,
    versions: BTreeMap<PackageName, VersionId>,
}

impl Selection {
    pub fn new() -> Self {
        Selection {
            schema_version: SCHEMA_VERSION,
            versions: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &PackageName) -> Option<&VersionId> {
        self.versions.get(name)
    }

    pub fn contains(&self, name: &PackageName) -> bool {
        self.versions.contains_key(name)
    }

    pub fn set(&mut self, name: PackageName, version: VersionId) {
        self.versions.insert(name, version);
    }

    pub fn remove(&mut self, name: &PackageName) {
        self.versions.remove(name);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PackageName, &VersionId)> {
        self.versions.iter()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Read a selection file. A missing file is not an error: it reads as
    /// an empty selection so that the first resolve of a fresh checkout
    /// has nothing to be "tolerant" about (`spec.md` §5: unknown packages
    /// in a stale selection trigger a fetch rather than an error, which
    /// falls out naturally here since nothing is ever rejected for being
    /// unrecognized — the resolver/project builder decide what to do with
    /// a name it doesn't know).
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Selection::new());
        }
        let source = std::fs::read_to_string(path)?;
        Self::from_json(&source)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn from_json(source: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(source)
            .map_err(|e| Error::Serialization(format!("invalid selection document: {e}")))?;
        let obj = value
            .as_object()
            .ok_or_else(|| Error::Serialization("selection document is not an object".into()))?;
        let schema_version = obj
            .get("fileVersion")
            .and_then(Value::as_u64)
            .unwrap_or(SCHEMA_VERSION as u64) as u32;
        let mut versions = BTreeMap::new();
        if let Some(Value::Object(entries)) = obj.get("versions") {
            for (name, v) in entries {
                let version = version_from_json(v)
                    .map_err(|e| Error::Serialization(format!("selection entry '{name}': {e}")))?;
                versions.insert(PackageName::new(name.clone()), version);
            }
        }
        Ok(Selection { schema_version, versions })
    }

    pub fn to_json(&self) -> Result<String> {
        let mut versions = Map::new();
        for (name, version) in &self.versions {
            versions.insert(name.0.clone(), version_to_json(version));
        }
        let mut root = Map::new();
        root.insert("fileVersion".to_string(), Value::from(self.schema_version));
        root.insert("versions".to_string(), Value::Object(versions));
        serde_json::to_string_pretty(&Value::Object(root))
            .map_err(|e| Error::Serialization(e.to_string()))
    }
}

fn version_to_json(version: &VersionId) -> Value {
    match version {
        VersionId::Release(v) => Value::String(v.to_string()),
        VersionId::Branch(name) => Value::String(format!("~{name}")),
        VersionId::Path(p) => {
            let mut obj = Map::new();
            obj.insert("path".to_string(), Value::String(p.display().to_string()));
            Value::Object(obj)
        }
    }
}

fn version_from_json(value: &Value) -> std::result::Result<VersionId, String> {
    match value {
        Value::String(s) => {
            if let Some(branch) = s.strip_prefix('~') {
                Ok(VersionId::branch(branch.to_string()))
            } else {
                semver::Version::parse(s).map(VersionId::Release).map_err(|e| e.to_string())
            }
        }
        Value::Object(obj) => {
            let path = obj
                .get("path")
                .and_then(Value::as_str)
                .ok_or_else(|| "object selection entry missing 'path'".to_string())?;
            Ok(VersionId::path(path))
        }
        other => Err(format!("unsupported selection entry shape: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_release_branch_and_path_entries() {
        let mut sel = Selection::new();
        sel.set(PackageName::new("a"), VersionId::release(semver::Version::new(1, 2, 3)));
        sel.set(PackageName::new("b"), VersionId::branch("main"));
        sel.set(PackageName::new("c"), VersionId::path("../c"));

        let json = sel.to_json().unwrap();
        let parsed = Selection::from_json(&json).unwrap();
        assert_eq!(parsed, sel);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let sel = Selection::load(&dir.path().join("dub.selections.json")).unwrap();
        assert!(sel.is_empty());
    }

    #[test]
    fn unknown_top_level_fields_are_ignored() {
        let sel = Selection::from_json(r#"{"fileVersion":1,"versions":{},"futureField":true}"#).unwrap();
        assert!(sel.is_empty());
    }
}
