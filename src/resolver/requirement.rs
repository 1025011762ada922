// src/resolver/requirement.rs

//! A `Requirement` is one requester's demand on a package name; the
//! solver accumulates these as it expands recipes and intersects the
//! active ones to get a package's effective constraint.

use crate::version::Constraint;

use super::ROOT_REQUESTER;

#[derive(Debug, Clone)]
pub(crate) struct Requirement {
    pub(crate) requester: String,
    pub(crate) constraint: Constraint,
    pub(crate) optional: bool,
    pub(crate) default: bool,
}

impl Requirement {
    pub(crate) fn root(constraint: Constraint, optional: bool, default: bool) -> Self {
        Requirement {
            requester: ROOT_REQUESTER.to_string(),
            constraint,
            optional,
            default,
        }
    }

    pub(crate) fn from(requester: &str, constraint: Constraint, optional: bool, default: bool) -> Self {
        Requirement {
            requester: requester.to_string(),
            constraint,
            optional,
            default,
        }
    }

    /// Whether this requirement currently contributes to the effective
    /// constraint: unconditional if non-optional, or if it is the root's
    /// own `default: true` opt-in (`spec.md` §4.4 activation rule (c)).
    pub(crate) fn is_unconditionally_active(&self) -> bool {
        !self.optional || (self.default && self.requester == ROOT_REQUESTER)
    }
}
