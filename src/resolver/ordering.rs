// src/resolver/ordering.rs

//! Work-queue ordering (`spec.md` §4.4): path-based dependencies first
//! (unique candidate), branch-named next, then interval-constrained
//! packages in decreasing domain size; ties broken by package name.

use crate::version::Constraint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Category {
    /// A constraint with no admissible candidate at all: surfaced first so
    /// a dead end is hit before sinking work into unrelated branches.
    Conflict,
    Path,
    Branch,
    Interval,
}

pub(crate) fn category(constraint: &Constraint) -> Category {
    match constraint {
        Constraint::None => Category::Conflict,
        Constraint::Path(_) => Category::Path,
        Constraint::Branch(_) => Category::Branch,
        Constraint::Interval(_) | Constraint::Any => Category::Interval,
    }
}

/// Sort key for the pending queue: lower sorts first. Interval domain size
/// is negated so that larger domains (more candidates still open) are
/// visited before smaller, tightly-constrained ones, per spec.
pub(crate) fn sort_key<'a>(name: &'a str, cat: Category, domain_size: usize) -> (Category, i64, &'a str) {
    let domain_rank = if cat == Category::Interval { -(domain_size as i64) } else { 0 };
    (cat, domain_rank, name)
}
