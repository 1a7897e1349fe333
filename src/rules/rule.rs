//! The rule trait and the concrete path-based rule.

use super::path::ResourcePath;
use std::fmt;

/// A scheduling rule: the subtree an operation intends to mutate.
///
/// Implementations must keep the predicates pure and consistent:
///
/// - `contains` is reflexive and transitive;
/// - `conflicts` is symmetric;
/// - `contains(a, b)` implies `!conflicts(a, b)` unless `a == b`.
pub trait Rule: Clone + Eq + Send + Sync + fmt::Debug + fmt::Display + 'static {
    /// Whether any work valid under `other` is also valid under `self`.
    fn contains(&self, other: &Self) -> bool;

    /// Whether concurrent work under `self` and `other` must be serialized.
    fn conflicts(&self, other: &Self) -> bool;

    /// Whether the two rules have no relation at all. Operations under
    /// independent rules proceed fully in parallel with no synchronization
    /// between them.
    fn is_independent(&self, other: &Self) -> bool {
        !self.conflicts(other) && !self.contains(other) && !other.contains(self)
    }
}

/// A rule covering a set of resource-path prefixes (usually one).
///
/// Containment is prefix descent: `/project` contains `/project/src/lib.rs`,
/// and the root rule contains everything. Two rules conflict when they are
/// equal, or when their covered sets overlap while neither rule contains the
/// other, which is only reachable once a rule covers several prefixes, e.g.
/// via [`PathRule::combine`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathRule {
    // Sorted, minimal: no covered path is a prefix of another.
    paths: Vec<ResourcePath>,
}

impl PathRule {
    /// A rule covering the subtree under a single path.
    pub fn new(path: &str) -> Self {
        Self {
            paths: vec![ResourcePath::new(path)],
        }
    }

    /// The root rule, which contains every other rule.
    pub fn root() -> Self {
        Self {
            paths: vec![ResourcePath::root()],
        }
    }

    /// The smallest rule containing both `self` and `other`.
    ///
    /// Used by callers that mutate several unrelated subtrees in a single
    /// operation. Covered paths nested under another covered path are
    /// absorbed, so the covered set stays minimal.
    pub fn combine(&self, other: &Self) -> Self {
        let mut paths = self.paths.clone();
        paths.extend(other.paths.iter().cloned());
        Self {
            paths: Self::normalize(paths),
        }
    }

    /// The covered path prefixes, sorted.
    pub fn covered_paths(&self) -> &[ResourcePath] {
        &self.paths
    }

    /// Drop paths covered by another path, then sort and dedup so that
    /// equal rules compare equal regardless of construction order.
    fn normalize(paths: Vec<ResourcePath>) -> Vec<ResourcePath> {
        let mut minimal: Vec<ResourcePath> = Vec::with_capacity(paths.len());
        for path in &paths {
            if paths
                .iter()
                .any(|p| p != path && p.is_prefix_of(path) && !path.is_prefix_of(p))
            {
                continue;
            }
            minimal.push(path.clone());
        }
        minimal.sort();
        minimal.dedup();
        minimal
    }
}

impl Rule for PathRule {
    fn contains(&self, other: &Self) -> bool {
        other
            .paths
            .iter()
            .all(|p| self.paths.iter().any(|s| s.is_prefix_of(p)))
    }

    fn conflicts(&self, other: &Self) -> bool {
        if self == other {
            return true;
        }
        if self.contains(other) || other.contains(self) {
            return false;
        }
        self.paths
            .iter()
            .any(|p| other.paths.iter().any(|q| p.overlaps(q)))
    }
}

impl fmt::Display for PathRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.paths.as_slice() {
            [single] => write!(f, "{}", single),
            many => {
                write!(f, "[")?;
                for (i, path) in many.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", path)?;
                }
                write!(f, "]")
            }
        }
    }
}
