// src/recipe/settings.rs

//! `BuildSettings`: additive key-value bundles merged across the
//! configuration, the build-type overlay, and propagated dependency
//! options. Flag arrays are order-sensitive and never de-duplicated;
//! every other array is concatenated with de-duplication.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// A single hook command plus the working directory it runs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookCommand {
    pub command: String,
    #[serde(default)]
    pub working_directory: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuildSettings {
    #[serde(default)]
    pub versions: Vec<String>,
    #[serde(default)]
    pub import_paths: Vec<String>,
    #[serde(default)]
    pub string_import_paths: Vec<String>,
    #[serde(default)]
    pub source_files: Vec<String>,
    #[serde(default)]
    pub excluded_source_files: Vec<String>,
    #[serde(default)]
    pub dflags: Vec<String>,
    #[serde(default)]
    pub lflags: Vec<String>,
    #[serde(default)]
    pub cflags: Vec<String>,
    #[serde(default)]
    pub libs: Vec<String>,
    #[serde(default)]
    pub copy_files: Vec<String>,
    #[serde(default)]
    pub pre_build_commands: Vec<HookCommand>,
    #[serde(default)]
    pub post_build_commands: Vec<HookCommand>,
    #[serde(default)]
    pub pre_generate_commands: Vec<HookCommand>,
    #[serde(default)]
    pub post_generate_commands: Vec<HookCommand>,
    #[serde(default)]
    pub environments: HashMap<String, String>,
}

/// Array fields whose ordering matters and must never be deduplicated.
/// `merge` treats these as pure concatenation; everything else is
/// concatenated then deduplicated, preserving first occurrence.
const ORDER_SENSITIVE_FLAG_FIELDS: &[&str] = &["dflags", "lflags", "cflags"];

impl BuildSettings {
    pub fn is_order_sensitive_field(name: &str) -> bool {
        ORDER_SENSITIVE_FLAG_FIELDS.contains(&name)
    }

    /// Merge `other` into `self` by concatenation. Flag arrays
    /// (`dflags`/`lflags`/`cflags`) preserve order and are never
    /// deduplicated; every other array is de-duplicated (first occurrence
    /// wins its position). `prepend` controls whether `other`'s entries for
    /// the order-sensitive flag fields come before or after `self`'s.
    pub fn merge(&mut self, other: &BuildSettings, prepend_flags: bool) {
        dedup_extend(&mut self.versions, &other.versions);
        dedup_extend(&mut self.import_paths, &other.import_paths);
        dedup_extend(&mut self.string_import_paths, &other.string_import_paths);
        dedup_extend(&mut self.source_files, &other.source_files);
        dedup_extend(&mut self.excluded_source_files, &other.excluded_source_files);
        dedup_extend(&mut self.libs, &other.libs);
        dedup_extend(&mut self.copy_files, &other.copy_files);

        if prepend_flags {
            prepend(&mut self.dflags, &other.dflags);
            prepend(&mut self.lflags, &other.lflags);
            prepend(&mut self.cflags, &other.cflags);
        } else {
            self.dflags.extend(other.dflags.iter().cloned());
            self.lflags.extend(other.lflags.iter().cloned());
            self.cflags.extend(other.cflags.iter().cloned());
        }

        self.pre_build_commands.extend(other.pre_build_commands.iter().cloned());
        self.post_build_commands.extend(other.post_build_commands.iter().cloned());
        self.pre_generate_commands.extend(other.pre_generate_commands.iter().cloned());
        self.post_generate_commands.extend(other.post_generate_commands.iter().cloned());

        for (k, v) in &other.environments {
            self.environments.insert(k.clone(), v.clone());
        }
    }

    /// Settings a static-library dependency contributes to its consumer:
    /// import paths and string-import paths (so the consumer can see its
    /// headers/modules), but no link inputs (those belong to whoever
    /// finally links).
    pub fn inherited_for_static_lib_consumer(&self) -> BuildSettings {
        BuildSettings {
            import_paths: self.import_paths.clone(),
            string_import_paths: self.string_import_paths.clone(),
            versions: self.versions.clone(),
            ..Default::default()
        }
    }

    /// Settings a source-library dependency contributes to its consumer:
    /// everything except the native libraries/linker flags it would have
    /// used to link its own (nonexistent) artifact — a source library has
    /// no compiled output, so its sources, flags, and import paths all
    /// flow directly into whoever depends on it.
    pub fn inherited_for_source_lib_consumer(&self) -> BuildSettings {
        BuildSettings {
            libs: Vec::new(),
            lflags: Vec::new(),
            ..self.clone()
        }
    }

    /// Expand glob patterns in `source_files`/`excluded_source_files`
    /// against `base_dir` (`spec.md` §3: "source-file globs"). Entries with
    /// no glob metacharacter pass through unchanged so a literal path that
    /// does not exist on disk yet still surfaces as a normal missing-file
    /// error from whatever reads it next, rather than silently vanishing.
    pub fn expand_source_globs(&mut self, base_dir: &Path) {
        self.source_files = expand_field(&self.source_files, base_dir);
        self.excluded_source_files = expand_field(&self.excluded_source_files, base_dir);
    }
}

fn is_glob_pattern(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

fn expand_field(entries: &[String], base_dir: &Path) -> Vec<String> {
    let mut out = Vec::new();
    for entry in entries {
        if !is_glob_pattern(entry) {
            out.push(entry.clone());
            continue;
        }
        let pattern = base_dir.join(entry);
        let pattern_str = pattern.to_string_lossy().into_owned();
        let mut matches: Vec<String> = match glob::glob(&pattern_str) {
            Ok(paths) => paths
                .filter_map(|p| p.ok())
                .filter(|p| p.is_file())
                .filter_map(|p| p.strip_prefix(base_dir).ok().map(|rel| rel.to_string_lossy().into_owned()))
                .collect(),
            Err(_) => Vec::new(),
        };
        matches.sort();
        for m in matches {
            if !out.contains(&m) {
                out.push(m);
            }
        }
    }
    out
}

fn dedup_extend(dst: &mut Vec<String>, src: &[String]) {
    for item in src {
        if !dst.contains(item) {
            dst.push(item.clone());
        }
    }
}

fn prepend(dst: &mut Vec<String>, src: &[String]) {
    let mut merged = src.to_vec();
    merged.append(dst);
    *dst = merged;
}
