// src/version/constraint.rs

//! The constraint language: intervals over release versions, exact
//! versions (a degenerate interval), branch matches, path matches, "any",
//! and the absorbing "none".

use std::fmt;
use std::path::{Path, PathBuf};

use semver::Version;

use super::id::VersionId;

/// An interval endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bound {
    Unbounded,
    Inclusive(Version),
    Exclusive(Version),
}

/// `[lo, hi)`-style interval over release versions, open on either side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub lo: Bound,
    pub hi: Bound,
}

impl Interval {
    pub fn any() -> Self {
        Interval {
            lo: Bound::Unbounded,
            hi: Bound::Unbounded,
        }
    }

    pub fn exact(v: Version) -> Self {
        Interval {
            lo: Bound::Inclusive(v.clone()),
            hi: Bound::Inclusive(v),
        }
    }

    pub fn at_least(v: Version) -> Self {
        Interval {
            lo: Bound::Inclusive(v),
            hi: Bound::Unbounded,
        }
    }

    pub fn below(v: Version) -> Self {
        Interval {
            lo: Bound::Unbounded,
            hi: Bound::Exclusive(v),
        }
    }

    /// Whether this interval could ever admit a version (lo <= hi under the
    /// bound semantics; a crossed or empty point interval is detected here).
    pub fn is_empty(&self) -> bool {
        match (&self.lo, &self.hi) {
            (Bound::Unbounded, _) | (_, Bound::Unbounded) => false,
            (Bound::Inclusive(a), Bound::Inclusive(b)) => a > b,
            (Bound::Inclusive(a), Bound::Exclusive(b)) => a >= b,
            (Bound::Exclusive(a), Bound::Inclusive(b)) => a >= b,
            (Bound::Exclusive(a), Bound::Exclusive(b)) => a >= b,
        }
    }

    pub fn contains(&self, v: &Version) -> bool {
        let lo_ok = match &self.lo {
            Bound::Unbounded => true,
            Bound::Inclusive(b) => v >= b,
            Bound::Exclusive(b) => v > b,
        };
        let hi_ok = match &self.hi {
            Bound::Unbounded => true,
            Bound::Inclusive(b) => v <= b,
            Bound::Exclusive(b) => v < b,
        };
        lo_ok && hi_ok
    }

    /// Whether the interval would admit prerelease versions of its own
    /// endpoint release (only the case when an endpoint is itself a
    /// prerelease, or the interval is unbounded above).
    fn endpoint_is_prerelease(&self) -> bool {
        match (&self.lo, &self.hi) {
            (Bound::Inclusive(v) | Bound::Exclusive(v), _) if !v.pre.is_empty() => true,
            (_, Bound::Inclusive(v) | Bound::Exclusive(v)) if !v.pre.is_empty() => true,
            _ => false,
        }
    }

    fn intersect(&self, other: &Interval) -> Interval {
        let lo = max_bound(&self.lo, &other.lo);
        let hi = min_bound(&self.hi, &other.hi);
        Interval { lo, hi }
    }
}

fn max_bound(a: &Bound, b: &Bound) -> Bound {
    match (a, b) {
        (Bound::Unbounded, x) | (x, Bound::Unbounded) => x.clone(),
        (Bound::Inclusive(x), Bound::Inclusive(y)) => {
            if x >= y {
                a.clone()
            } else {
                b.clone()
            }
        }
        (Bound::Exclusive(x), Bound::Exclusive(y)) => {
            if x >= y {
                a.clone()
            } else {
                b.clone()
            }
        }
        (Bound::Inclusive(x), Bound::Exclusive(y)) => {
            if x > y {
                a.clone()
            } else {
                b.clone()
            }
        }
        (Bound::Exclusive(x), Bound::Inclusive(y)) => {
            if x >= y {
                a.clone()
            } else {
                b.clone()
            }
        }
    }
}

fn min_bound(a: &Bound, b: &Bound) -> Bound {
    match (a, b) {
        (Bound::Unbounded, x) | (x, Bound::Unbounded) => x.clone(),
        (Bound::Inclusive(x), Bound::Inclusive(y)) => {
            if x <= y {
                a.clone()
            } else {
                b.clone()
            }
        }
        (Bound::Exclusive(x), Bound::Exclusive(y)) => {
            if x <= y {
                a.clone()
            } else {
                b.clone()
            }
        }
        (Bound::Inclusive(x), Bound::Exclusive(y)) => {
            if x < y {
                a.clone()
            } else {
                b.clone()
            }
        }
        (Bound::Exclusive(x), Bound::Inclusive(y)) => {
            if x <= y {
                a.clone()
            } else {
                b.clone()
            }
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Bound::Inclusive(a), Bound::Inclusive(b)) = (&self.lo, &self.hi) {
            if a == b {
                return write!(f, "=={a}");
            }
        }
        match &self.lo {
            Bound::Unbounded => {}
            Bound::Inclusive(v) => write!(f, ">={v} ")?,
            Bound::Exclusive(v) => write!(f, ">{v} ")?,
        }
        match &self.hi {
            Bound::Unbounded => {
                if matches!(self.lo, Bound::Unbounded) {
                    write!(f, "*")?;
                }
            }
            Bound::Inclusive(v) => write!(f, "<={v}")?,
            Bound::Exclusive(v) => write!(f, "<{v}")?,
        }
        Ok(())
    }
}

/// How two constraints combine when at least one side is a path or branch
/// pointer and the other is an interval. `spec.md` §4.4 leaves this a
/// caller-controlled choice for diamond resolution; see `DESIGN.md` for the
/// default the resolver uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Strict intersection: interval x (branch|path) = None.
    Strict,
    /// The non-interval side wins outright and the interval side is
    /// discarded, so long as the two sides are not both non-interval and
    /// disagreeing (that case is always `None`).
    PathOrBranchOverridesRange,
}

/// The constraint language intersected by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Any,
    None,
    Interval(Interval),
    Branch(String),
    Path(PathBuf),
}

impl Constraint {
    pub fn any() -> Self {
        Constraint::Any
    }

    pub fn none() -> Self {
        Constraint::None
    }

    pub fn exact(v: Version) -> Self {
        Constraint::Interval(Interval::exact(v))
    }

    pub fn branch(name: impl Into<String>) -> Self {
        Constraint::Branch(name.into())
    }

    pub fn path(p: impl AsRef<Path>) -> Self {
        Constraint::Path(super::id::normalize(p.as_ref()))
    }

    /// Parse a constraint from its textual spelling.
    ///
    /// Supports `*`/empty ("any"), `~branchname`, `==V` (exact), `~>V`
    /// (tilde lowering, §4.1), and space-separated two-sided ranges such as
    /// `>=1.0.0 <2.0.0`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() || s == "*" {
            return Ok(Constraint::Any);
        }
        if let Some(rest) = s.strip_prefix("~>") {
            return Ok(Constraint::Interval(parse_tilde(rest)?));
        }
        if let Some(rest) = s.strip_prefix('~') {
            if rest.is_empty() {
                return Err("empty branch name after '~'".into());
            }
            return Ok(Constraint::Branch(rest.to_string()));
        }
        if let Some(rest) = s.strip_prefix("==") {
            let v = Version::parse(rest.trim()).map_err(|e| e.to_string())?;
            return Ok(Constraint::exact(v));
        }

        // One or two space-separated relational terms.
        let mut lo = Bound::Unbounded;
        let mut hi = Bound::Unbounded;
        for term in s.split_whitespace() {
            let (op, rest) = split_operator(term)?;
            let v = Version::parse(rest.trim()).map_err(|e| e.to_string())?;
            match op {
                ">=" => lo = Bound::Inclusive(v),
                ">" => lo = Bound::Exclusive(v),
                "<=" => hi = Bound::Inclusive(v),
                "<" => hi = Bound::Exclusive(v),
                "=" => return Ok(Constraint::exact(v)),
                _ => return Err(format!("unsupported operator in constraint term '{term}'")),
            }
        }
        Ok(Constraint::Interval(Interval { lo, hi }))
    }

    pub fn matches(&self, version: &VersionId) -> bool {
        match (self, version) {
            (Constraint::Any, _) => true,
            (Constraint::None, _) => false,
            (Constraint::Interval(iv), VersionId::Release(v)) => {
                if !v.pre.is_empty() && !iv.endpoint_is_prerelease() {
                    // Prereleases only match when the interval explicitly
                    // mentions a prerelease endpoint of the same release,
                    // unless the caller has separately opted into upgrade
                    // mode (handled by the resolver, not here).
                    return false;
                }
                iv.contains(v)
            }
            (Constraint::Branch(name), VersionId::Branch(b)) => name == b,
            (Constraint::Path(p), VersionId::Path(q)) => p == q,
            _ => false,
        }
    }

    pub fn intersect(&self, other: &Constraint) -> Constraint {
        self.merge(other, MergeMode::Strict)
    }

    pub fn merge(&self, other: &Constraint, mode: MergeMode) -> Constraint {
        use Constraint::*;
        match (self, other) {
            (None, _) | (_, None) => Constraint::None,
            (Any, x) | (x, Any) => x.clone(),
            (Interval(a), Interval(b)) => {
                let iv = a.intersect(b);
                if iv.is_empty() {
                    Constraint::None
                } else {
                    Constraint::Interval(iv)
                }
            }
            (Branch(a), Branch(b)) => {
                if a == b {
                    Constraint::Branch(a.clone())
                } else {
                    Constraint::None
                }
            }
            (Path(a), Path(b)) => {
                if a == b {
                    Constraint::Path(a.clone())
                } else {
                    Constraint::None
                }
            }
            (Interval(_), non_interval) | (non_interval, Interval(_)) => match mode {
                MergeMode::Strict => Constraint::None,
                MergeMode::PathOrBranchOverridesRange => non_interval.clone(),
            },
            // Branch vs Path: never compatible regardless of merge mode.
            _ => Constraint::None,
        }
    }
}

fn parse_tilde(rest: &str) -> Result<Interval, String> {
    let parts: Vec<&str> = rest.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(format!("invalid tilde version '{rest}'"));
    }
    let nums: Result<Vec<u64>, _> = parts.iter().map(|p| p.parse::<u64>()).collect();
    let nums = nums.map_err(|e| e.to_string())?;
    let major = nums[0];
    let minor = *nums.get(1).unwrap_or(&0);
    let patch = *nums.get(2).unwrap_or(&0);
    let lo = Version::new(major, minor, patch);
    let hi = match nums.len() {
        1 => Version::new(major + 1, 0, 0),
        2 => Version::new(major, minor + 1, 0),
        _ => Version::new(major, minor, patch + 1),
    };
    Ok(Interval {
        lo: Bound::Inclusive(lo),
        hi: Bound::Exclusive(hi),
    })
}

fn split_operator(term: &str) -> Result<(&str, &str), String> {
    for op in [">=", "<=", "==", ">", "<", "="] {
        if let Some(rest) = term.strip_prefix(op) {
            return Ok((if op == "==" { "=" } else { op }, rest));
        }
    }
    Err(format!("constraint term '{term}' has no recognized operator"))
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Any => write!(f, "*"),
            Constraint::None => write!(f, "<none>"),
            Constraint::Interval(iv) => write!(f, "{iv}"),
            Constraint::Branch(name) => write!(f, "~{name}"),
            Constraint::Path(p) => write!(f, "{}", p.display()),
        }
    }
}
