// src/resolver/mod.rs

//! The dependency resolver (C4): a DPLL-style backtracking search that
//! picks one concrete version per reachable package, given a root recipe,
//! a set of `PackageSupplier`s, and an optional prior selection to
//! minimize regressions against.
//!
//! The search is expressed as an explicit recursive `Result`-returning
//! state machine (`engine::Solver::solve`) rather than exception-driven
//! backtracking: each candidate is tried in a loop, assignments are undone
//! on failure, and the final `Err` carries the same structured fields a
//! caller would otherwise only get from catching an exception.

mod engine;
mod ordering;
mod requirement;

use std::collections::BTreeMap;

use crate::error::Result;
use crate::interfaces::PackageSupplier;
use crate::package_manager::PackageManager;
use crate::recipe::Recipe;
use crate::selection::Selection;
use crate::version::{MergeMode, VersionId};

pub use engine::{Resolution, ResolvedPackage};

/// Governs prerelease admission during an upgrade. `spec.md`'s Open
/// Questions leave it unclear whether this should be per-package or
/// global; this implementation treats it as one invocation-wide setting
/// (see `DESIGN.md`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpgradeMode {
    #[default]
    None,
    /// Prefer the highest release, ignoring the prior selection.
    Compatible,
    /// Additionally admit prereleases as upgrade candidates.
    Prerelease,
}

#[derive(Debug, Clone, Copy)]
pub struct ResolverOptions {
    pub upgrade: UpgradeMode,
    /// How an interval constraint combines with a path/branch constraint
    /// from a different requester (`spec.md` §4.1/§4.4's caller-controlled
    /// diamond-resolution flag).
    pub diamond_merge: MergeMode,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        ResolverOptions {
            upgrade: UpgradeMode::None,
            diamond_merge: MergeMode::Strict,
        }
    }
}

pub(crate) const ROOT_REQUESTER: &str = "<root>";

/// Resolve `root`'s transitive dependencies into one concrete version per
/// reachable package.
pub fn resolve(
    root: &Recipe,
    suppliers: &[Box<dyn PackageSupplier>],
    manager: &PackageManager,
    prior: Option<&Selection>,
    options: ResolverOptions,
) -> Result<Resolution> {
    let mut solver = engine::Solver::new(suppliers, manager, prior, options);
    solver.seed(root)?;
    solver.solve()?;
    let resolution = solver.into_resolution();
    check_for_cycles(root, &resolution, manager, suppliers)?;
    Ok(resolution)
}

/// Load a resolved package's recipe the same way the solver did: prefer
/// the package manager, fall back to a supplier's `fetch_recipe`.
fn load_recipe_for_cycle_check(
    manager: &PackageManager,
    suppliers: &[Box<dyn PackageSupplier>],
    name: &crate::recipe::PackageName,
    version: &VersionId,
) -> Option<Recipe> {
    if let Ok(r) = manager.get_package(name, version) {
        return Some(r);
    }
    suppliers.iter().find_map(|s| s.fetch_recipe(&name.0, version).ok())
}

/// Post-hoc check for cycles among non-path-based dependency edges
/// (`spec.md` §4.4: path-based cycles among sibling subpackages of a
/// single root are permitted, everything else must be acyclic).
fn check_for_cycles(
    root: &Recipe,
    resolution: &Resolution,
    manager: &PackageManager,
    suppliers: &[Box<dyn PackageSupplier>],
) -> Result<()> {
    let mut graph: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut path_edges: std::collections::HashSet<(String, String)> = Default::default();

    let mut record = |from: &str, dep: &crate::recipe::Dependency, graph: &mut BTreeMap<String, Vec<String>>| {
        if dep.name.0.starts_with(':') {
            return;
        }
        let (parent, _child) = dep.name.split_subpackage();
        let target = parent.unwrap_or(dep.name.0.as_str()).to_string();
        graph.entry(from.to_string()).or_default().push(target.clone());
        if matches!(dep.constraint, crate::version::Constraint::Path(_)) {
            path_edges.insert((from.to_string(), target));
        }
    };

    for dep in &root.dependencies {
        record(ROOT_REQUESTER, dep, &mut graph);
    }
    for (name, pkg) in &resolution.packages {
        if let Some(recipe) = load_recipe_for_cycle_check(manager, suppliers, name, &pkg.version) {
            for dep in &recipe.dependencies {
                record(&name.0, dep, &mut graph);
            }
        }
    }

    if let Some(cycle) = find_cycle(&graph, &path_edges) {
        return Err(crate::error::Error::Cycle { edges: cycle });
    }
    Ok(())
}

fn find_cycle(
    graph: &BTreeMap<String, Vec<String>>,
    path_edges: &std::collections::HashSet<(String, String)>,
) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Done,
    }
    let mut marks: std::collections::HashMap<String, Mark> = Default::default();
    let mut stack: Vec<String> = Vec::new();

    fn visit(
        node: &str,
        graph: &BTreeMap<String, Vec<String>>,
        path_edges: &std::collections::HashSet<(String, String)>,
        marks: &mut std::collections::HashMap<String, Mark>,
        stack: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        if marks.contains_key(node) {
            return None;
        }
        if stack.iter().any(|n| n == node) {
            let start = stack.iter().position(|n| n == node).unwrap();
            return Some(stack[start..].to_vec());
        }
        stack.push(node.to_string());
        if let Some(edges) = graph.get(node) {
            for target in edges {
                if path_edges.contains(&(node.to_string(), target.clone())) {
                    continue;
                }
                if let Some(cycle) = visit(target, graph, path_edges, marks, stack) {
                    return Some(cycle);
                }
            }
        }
        stack.pop();
        marks.insert(node.to_string(), Mark::Done);
        None
    }

    for node in graph.keys() {
        if let Some(cycle) = visit(node, graph, path_edges, &mut marks, &mut stack) {
            return Some(cycle);
        }
    }
    None
}

#[cfg(test)]
mod tests;
