// src/resolver/engine.rs

//! The backtracking search itself.

use std::collections::BTreeMap;

use semver::Version;

use crate::error::{Error, Result};
use crate::interfaces::PackageSupplier;
use crate::package_manager::PackageManager;
use crate::recipe::{PackageName, Recipe};
use crate::selection::Selection;
use crate::version::{Constraint, VersionId};

use super::ordering::{category, sort_key, Category};
use super::requirement::Requirement;
use super::{ResolverOptions, UpgradeMode, ROOT_REQUESTER};

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPackage {
    pub version: VersionId,
}

/// The outcome of a successful resolve: one version per reachable,
/// activated package. Ordered by name for deterministic iteration (and a
/// diff-friendly selection file).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub packages: BTreeMap<PackageName, ResolvedPackage>,
}

impl Resolution {
    pub fn version_of(&self, name: &PackageName) -> Option<&VersionId> {
        self.packages.get(name).map(|p| &p.version)
    }

    /// Record one package's version directly, bypassing a full resolve.
    /// Used to build a `Resolution` from an already-loaded `Selection`
    /// (a build with no new dependencies never re-resolves) and by tests
    /// assembling a fixture graph.
    pub fn insert(&mut self, name: PackageName, version: VersionId) {
        self.packages.insert(name, ResolvedPackage { version });
    }
}

pub(super) struct Solver<'a> {
    suppliers: &'a [Box<dyn PackageSupplier>],
    manager: &'a PackageManager,
    prior: Option<&'a Selection>,
    options: ResolverOptions,

    requirements: BTreeMap<String, Vec<Requirement>>,
    assigned: BTreeMap<String, VersionId>,
    pending: Vec<String>,
}

impl<'a> Solver<'a> {
    pub(super) fn new(
        suppliers: &'a [Box<dyn PackageSupplier>],
        manager: &'a PackageManager,
        prior: Option<&'a Selection>,
        options: ResolverOptions,
    ) -> Self {
        Solver {
            suppliers,
            manager,
            prior,
            options,
            requirements: BTreeMap::new(),
            assigned: BTreeMap::new(),
            pending: Vec::new(),
        }
    }

    pub(super) fn seed(&mut self, root: &Recipe) -> Result<()> {
        for dep in &root.dependencies {
            self.add_requirement(ROOT_REQUESTER, dep);
        }
        Ok(())
    }

    fn add_requirement(&mut self, requester: &str, dep: &crate::recipe::Dependency) {
        if dep.name.0.starts_with(':') {
            // A bare `:child` is the enclosing package's own subpackage;
            // it shares `requester`'s version and is not separately
            // resolved.
            return;
        }
        let (parent, _child) = dep.name.split_subpackage();
        let target = parent.unwrap_or(dep.name.0.as_str()).to_string();

        let requirement = if requester == ROOT_REQUESTER {
            Requirement::root(dep.constraint.clone(), dep.optional, dep.default)
        } else {
            Requirement::from(requester, dep.constraint.clone(), dep.optional, dep.default)
        };
        self.requirements.entry(target.clone()).or_default().push(requirement);

        if !self.assigned.contains_key(&target) && !self.pending.contains(&target) {
            self.pending.push(target);
        }
    }

    /// Whether `name` currently has at least one active requirement
    /// (`spec.md` §4.4's optional-dependency activation rules (a)-(c); (b)
    /// reduces to "any recorded requirement is non-optional" because a
    /// requirement is only recorded once its requester has itself been
    /// assigned).
    fn is_activated(&self, name: &str) -> bool {
        if self
            .prior
            .map(|p| p.contains(&PackageName::new(name.to_string())))
            .unwrap_or(false)
        {
            return true;
        }
        self.requirements
            .get(name)
            .map(|reqs| reqs.iter().any(Requirement::is_unconditionally_active))
            .unwrap_or(false)
    }

    fn effective_constraint(&self, name: &str) -> Constraint {
        let mut acc = Constraint::Any;
        if let Some(reqs) = self.requirements.get(name) {
            for r in reqs.iter().filter(|r| r.is_unconditionally_active()) {
                acc = acc.merge(&r.constraint, self.options.diamond_merge);
            }
        }
        acc
    }

    fn requesters_and_constraints(&self, name: &str) -> (Vec<String>, Vec<Constraint>) {
        let reqs = self.requirements.get(name).cloned().unwrap_or_default();
        let active: Vec<&Requirement> = reqs.iter().filter(|r| r.is_unconditionally_active()).collect();
        (
            active.iter().map(|r| r.requester.clone()).collect(),
            active.iter().map(|r| r.constraint.clone()).collect(),
        )
    }

    /// Pick the next pending package per the ordering rule, removing it
    /// from the queue.
    fn pick_next(&mut self) -> Option<String> {
        self.pending.retain(|n| !self.assigned.contains_key(n));
        if self.pending.is_empty() {
            return None;
        }
        let mut best_index = 0;
        let mut best_key = self.sort_key_for(&self.pending[0]);
        for (i, name) in self.pending.iter().enumerate().skip(1) {
            let key = self.sort_key_for(name);
            if key < best_key {
                best_key = key;
                best_index = i;
            }
        }
        Some(self.pending.remove(best_index))
    }

    fn sort_key_for(&self, name: &str) -> (Category, i64, String) {
        let constraint = self.effective_constraint(name);
        let cat = category(&constraint);
        let domain_size = if cat == Category::Interval {
            self.candidates_for(name, &constraint).map(|c| c.len()).unwrap_or(0)
        } else {
            0
        };
        let (c, rank, n) = sort_key(name, cat, domain_size);
        (c, rank, n.to_string())
    }

    /// Candidate versions for `name` under `constraint`, in the order
    /// they should be tried: the prior selection first if still
    /// admissible, then descending release order, honoring prerelease
    /// admission rules.
    fn candidates_for(&self, name: &str, constraint: &Constraint) -> Result<Vec<VersionId>> {
        if *constraint == Constraint::None {
            return Ok(Vec::new());
        }
        let pname = PackageName::new(name.to_string());
        if let Some(ovr) = self.manager.override_for(&pname, constraint) {
            return Ok(vec![ovr.replacement.clone()]);
        }
        if let Some(path) = self.manager.path_override(&pname) {
            return Ok(vec![VersionId::path(path)]);
        }
        match constraint {
            Constraint::Path(p) => Ok(vec![VersionId::Path(p.clone())]),
            Constraint::Branch(b) => Ok(vec![VersionId::Branch(b.clone())]),
            Constraint::Any | Constraint::Interval(_) => {
                let mut all: Vec<VersionId> = self.manager.find_versions(&pname)?;
                for s in self.suppliers {
                    all.extend(s.list_versions(name)?);
                }
                let mut releases: Vec<Version> = all
                    .into_iter()
                    .filter_map(|v| v.as_release().cloned())
                    .filter(|v| constraint.matches(&VersionId::Release(v.clone())))
                    .collect();
                releases.sort();
                releases.dedup();

                let non_pre: Vec<Version> = releases.iter().filter(|v| v.pre.is_empty()).cloned().collect();
                let allow_prerelease = matches!(self.options.upgrade, UpgradeMode::Prerelease);
                let mut pool = if non_pre.is_empty() || allow_prerelease { releases } else { non_pre };
                pool.sort_by(|a, b| b.cmp(a));
                pool.dedup();

                let mut ordered: Vec<VersionId> = pool.into_iter().map(VersionId::Release).collect();
                if !matches!(self.options.upgrade, UpgradeMode::Compatible | UpgradeMode::Prerelease) {
                    if let Some(prior) = self.prior.and_then(|p| p.get(&pname)) {
                        if constraint.matches(prior) {
                            if let Some(pos) = ordered.iter().position(|v| v == prior) {
                                let v = ordered.remove(pos);
                                ordered.insert(0, v);
                            }
                        }
                    }
                }
                Ok(ordered)
            }
            Constraint::None => Ok(Vec::new()),
        }
    }

    /// Load a candidate's recipe, preferring whatever the package manager
    /// already has on disk (path override, or a previously fetched cache
    /// entry) and falling back to each supplier's lightweight
    /// `fetch_recipe` for a version that has not been fetched yet.
    fn load_recipe(&self, name: &PackageName, version: &VersionId) -> Result<Recipe> {
        match self.manager.get_package(name, version) {
            Ok(r) => Ok(r),
            Err(manager_err) => {
                for supplier in self.suppliers {
                    if let Ok(r) = supplier.fetch_recipe(&name.0, version) {
                        return Ok(r);
                    }
                }
                Err(manager_err)
            }
        }
    }

    /// The recursive backtracking step: pick one package, try its
    /// candidates in order, recursing into the rest of the queue. Returns
    /// `Ok(())` once the queue is empty.
    pub(super) fn solve(&mut self) -> Result<()> {
        let name = match self.pick_next() {
            Some(n) => n,
            None => return Ok(()),
        };

        if !self.is_activated(&name) {
            // Inactive optional dependency: leave unassigned, permanently.
            return self.solve();
        }

        let constraint = self.effective_constraint(&name);
        if constraint == Constraint::None {
            let (requesters, constraints) = self.requesters_and_constraints(&name);
            return Err(Error::Conflict {
                package: name,
                requesters,
                constraints,
            });
        }

        let candidates = self.candidates_for(&name, &constraint)?;
        if candidates.is_empty() {
            return Err(Error::NoCompatibleVersion {
                name,
                constraint,
                observed: Vec::new(),
            });
        }

        let mut last_err: Option<Error> = None;
        for candidate in candidates {
            let pname = PackageName::new(name.clone());
            let recipe = match self.load_recipe(&pname, &candidate) {
                Ok(r) => r,
                Err(e) => {
                    last_err = Some(e);
                    continue;
                }
            };

            self.assigned.insert(name.clone(), candidate.clone());
            let added = self.enqueue_dependencies(&name, &recipe);

            if let Err(e) = self.revalidate_assigned(&added) {
                self.undo(&name, &added);
                last_err = Some(e);
                continue;
            }

            match self.solve() {
                Ok(()) => return Ok(()),
                Err(e) => {
                    self.undo(&name, &added);
                    last_err = Some(e);
                    continue;
                }
            }
        }

        self.pending.push(name.clone());
        Err(last_err.unwrap_or(Error::PackageNotFound {
            name,
            requested_by: Vec::new(),
        }))
    }

    /// Record `recipe`'s dependencies as requirements from `requester`,
    /// returning the set of package names that gained a *new* entry in
    /// `self.requirements` (a requester can be undone by truncating back
    /// to the length recorded before this call).
    fn enqueue_dependencies(&mut self, requester: &str, recipe: &Recipe) -> Vec<String> {
        let mut touched = Vec::new();
        for dep in &recipe.dependencies {
            if dep.name.0.starts_with(':') {
                continue;
            }
            let (parent, _child) = dep.name.split_subpackage();
            let target = parent.unwrap_or(dep.name.0.as_str()).to_string();
            self.add_requirement(requester, dep);
            touched.push(target);
        }
        touched
    }

    /// A dependency just discovered may name a package that an earlier,
    /// unrelated choice already assigned a version to. Re-check that the
    /// assignment still satisfies the (now wider) effective constraint;
    /// a mismatch is reported as the same `Conflict` a simultaneous
    /// discovery would have produced, and drives a backtrack exactly like
    /// any other conflict.
    fn revalidate_assigned(&self, touched: &[String]) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for target in touched {
            if !seen.insert(target) {
                continue;
            }
            if let Some(version) = self.assigned.get(target) {
                let constraint = self.effective_constraint(target);
                if !constraint.matches(version) {
                    let (requesters, constraints) = self.requesters_and_constraints(target);
                    return Err(Error::Conflict {
                        package: target.clone(),
                        requesters,
                        constraints,
                    });
                }
            }
        }
        Ok(())
    }

    /// Undo the effects of having assigned `name` to its current
    /// candidate: drop the assignment, retract the requirements it
    /// contributed, and re-enqueue any dependency name that has no
    /// remaining requirement from elsewhere (cleanly reverting the search
    /// state to just before this candidate was tried).
    fn undo(&mut self, name: &str, touched: &[String]) {
        self.assigned.remove(name);
        for target in touched {
            if let Some(reqs) = self.requirements.get_mut(target) {
                reqs.retain(|r| r.requester != name);
                if reqs.is_empty() {
                    self.requirements.remove(target);
                }
            }
            if !self.assigned.contains_key(target) && !self.pending.contains(target) {
                self.pending.push(target.clone());
            }
        }
    }

    pub(super) fn into_resolution(self) -> Resolution {
        let mut packages = BTreeMap::new();
        for (name, version) in self.assigned {
            packages.insert(PackageName::new(name), ResolvedPackage { version });
        }
        Resolution { packages }
    }
}
