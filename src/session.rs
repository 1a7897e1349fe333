//! Per-task lock sessions and the rule stack.
//!
//! A [`LockSession`] is the explicit record of everything one task holds:
//! the ordered stack of rules it has acquired and the *release-owed marker*.
//! The scheduler creates a session per unit of work and threads it through
//! the check-in / run / check-out cycle.
//!
//! # Nesting discipline
//!
//! The stack enforces strict LIFO nesting: a rule may only be pushed while
//! the current top contains it, and releases must mirror acquisitions in
//! exact reverse order. Violations are programming errors and fail fast
//! with [`LockError::IllegalNesting`] / [`LockError::UnmatchedRelease`].
//!
//! # The release-owed marker
//!
//! The marker is set at the single point inside `check_in` where the stack
//! push has unambiguously succeeded, and cleared only when the matching
//! release has run. It is the sole authority for "does this session owe a
//! release"; cleanup must never approximate it from any global state, which
//! can legitimately look locked for unrelated reasons at cleanup time.

use crate::error::{LockError, Result};
use crate::rules::Rule;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// A label for the current thread, used in lock diagnostics.
pub(crate) fn current_thread_label() -> String {
    let thread = std::thread::current();
    match thread.name() {
        Some(name) => format!("{}@{:?}", name, thread.id()),
        None => format!("{:?}", thread.id()),
    }
}

/// One held rule on a session's stack.
#[derive(Debug, Clone)]
pub struct HeldRule<R> {
    /// The held rule.
    pub rule: R,

    /// Monotonic acquisition sequence number within the session.
    pub seq: u64,

    /// When the rule was pushed.
    pub acquired_at: DateTime<Utc>,

    /// Whether the lock table acquisition for this frame committed.
    /// False between a failed table acquire and the cleanup that follows.
    pub(crate) granted: bool,
}

/// Ordered record of the rules a session currently holds.
///
/// Frames are strictly decreasing under containment from bottom to top.
#[derive(Debug)]
pub struct RuleStack<R: Rule> {
    frames: Vec<HeldRule<R>>,
    next_seq: u64,
}

impl<R: Rule> RuleStack<R> {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            next_seq: 0,
        }
    }

    /// Whether no rule is held.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of held rules.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The innermost held rule, if any.
    pub fn top(&self) -> Option<&HeldRule<R>> {
        self.frames.last()
    }

    /// Push a rule, enforcing the nesting discipline.
    ///
    /// Fails with `IllegalNesting` if the stack is non-empty and the current
    /// top does not contain `rule`. On failure nothing is modified.
    pub fn push(&mut self, rule: R) -> Result<u64> {
        if let Some(top) = self.frames.last()
            && !top.rule.contains(&rule)
        {
            return Err(LockError::IllegalNesting(format!(
                "requested {} while holding {}",
                rule,
                self.describe()
            )));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.frames.push(HeldRule {
            rule,
            seq,
            acquired_at: Utc::now(),
            granted: false,
        });
        Ok(seq)
    }

    /// Verify that `rule` is the innermost held rule.
    ///
    /// Fails with `UnmatchedRelease` if the stack is empty or the top
    /// differs, i.e. a release without a matching acquisition.
    pub fn expect_top(&self, rule: &R) -> Result<()> {
        match self.frames.last() {
            None => Err(LockError::UnmatchedRelease(format!(
                "released {} but no rule is held",
                rule
            ))),
            Some(top) if top.rule != *rule => Err(LockError::UnmatchedRelease(format!(
                "released {} but the innermost held rule is {} (stack: {})",
                rule,
                top.rule,
                self.describe()
            ))),
            Some(_) => Ok(()),
        }
    }

    /// Pop the innermost rule, which must equal `rule`.
    pub fn pop(&mut self, rule: &R) -> Result<HeldRule<R>> {
        self.expect_top(rule)?;
        self.frames.pop().ok_or_else(|| {
            LockError::UnmatchedRelease(format!("released {} but no rule is held", rule))
        })
    }

    /// Pop the innermost rule if it equals `rule`; `None` otherwise.
    pub(crate) fn pop_matching(&mut self, rule: &R) -> Option<HeldRule<R>> {
        match self.frames.last() {
            Some(top) if top.rule == *rule => self.frames.pop(),
            _ => None,
        }
    }

    /// Record that the lock table acquisition for the top frame committed.
    pub(crate) fn mark_top_granted(&mut self) {
        if let Some(top) = self.frames.last_mut() {
            top.granted = true;
        }
    }

    /// Whether the top frame's table acquisition committed.
    pub(crate) fn top_granted(&self) -> bool {
        self.frames.last().is_some_and(|f| f.granted)
    }

    /// Render the stack bottom-to-top for error messages, e.g.
    /// `/project > /project/src`.
    pub fn describe(&self) -> String {
        if self.frames.is_empty() {
            return "<no rules held>".to_string();
        }
        self.frames
            .iter()
            .map(|f| f.rule.to_string())
            .collect::<Vec<_>>()
            .join(" > ")
    }
}

impl<R: Rule> Default for RuleStack<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-task lock state threaded through the check-in / check-out cycle.
#[derive(Debug)]
pub struct LockSession<R: Rule> {
    id: u64,
    thread_label: String,
    stack: RuleStack<R>,
    release_owed: bool,
}

impl<R: Rule> LockSession<R> {
    /// Create a session owned by the calling thread.
    pub fn new() -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            thread_label: current_thread_label(),
            stack: RuleStack::new(),
            release_owed: false,
        }
    }

    /// Process-unique session id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Label of the thread that created the session.
    pub fn thread_label(&self) -> &str {
        &self.thread_label
    }

    /// The session's rule stack.
    pub fn stack(&self) -> &RuleStack<R> {
        &self.stack
    }

    /// The innermost held rule, if any.
    pub fn top_rule(&self) -> Option<&R> {
        self.stack.top().map(|f| &f.rule)
    }

    /// Whether the session holds no rules.
    pub fn is_idle(&self) -> bool {
        self.stack.is_empty()
    }

    /// Whether a release is currently owed for the latest check-in.
    pub fn release_owed(&self) -> bool {
        self.release_owed
    }

    pub(crate) fn stack_mut(&mut self) -> &mut RuleStack<R> {
        &mut self.stack
    }

    pub(crate) fn set_release_owed(&mut self, owed: bool) {
        self.release_owed = owed;
    }
}

impl<R: Rule> Default for LockSession<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::PathRule;

    #[test]
    fn push_requires_containment() {
        let mut stack: RuleStack<PathRule> = RuleStack::new();
        stack.push(PathRule::new("/project")).unwrap();

        // Narrower rule nests
        stack.push(PathRule::new("/project/src")).unwrap();
        assert_eq!(stack.depth(), 2);

        // Unrelated rule fails fast and modifies nothing
        let err = stack.push(PathRule::new("/other")).unwrap_err();
        assert!(matches!(err, LockError::IllegalNesting(_)));
        assert!(err.to_string().contains("/other"));
        assert!(err.to_string().contains("/project > /project/src"));
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn first_push_is_unconstrained() {
        let mut stack: RuleStack<PathRule> = RuleStack::new();
        stack.push(PathRule::new("/anything")).unwrap();
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn equal_rule_may_nest() {
        let mut stack: RuleStack<PathRule> = RuleStack::new();
        stack.push(PathRule::new("/p")).unwrap();
        stack.push(PathRule::new("/p")).unwrap();
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn pop_must_mirror_push_order() {
        let mut stack: RuleStack<PathRule> = RuleStack::new();
        let outer = PathRule::new("/project");
        let inner = PathRule::new("/project/src");
        stack.push(outer.clone()).unwrap();
        stack.push(inner.clone()).unwrap();

        // Releasing the outer rule first is unmatched
        let err = stack.pop(&outer).unwrap_err();
        assert!(matches!(err, LockError::UnmatchedRelease(_)));
        assert_eq!(stack.depth(), 2);

        stack.pop(&inner).unwrap();
        stack.pop(&outer).unwrap();
        assert!(stack.is_empty());
    }

    #[test]
    fn pop_on_empty_stack_is_unmatched() {
        let mut stack: RuleStack<PathRule> = RuleStack::new();
        let err = stack.pop(&PathRule::new("/p")).unwrap_err();
        assert!(matches!(err, LockError::UnmatchedRelease(_)));
        assert!(err.to_string().contains("no rule is held"));
    }

    #[test]
    fn sequence_numbers_are_monotonic() {
        let mut stack: RuleStack<PathRule> = RuleStack::new();
        let a = stack.push(PathRule::new("/p")).unwrap();
        let b = stack.push(PathRule::new("/p/q")).unwrap();
        assert!(b > a);
    }

    #[test]
    fn pop_matching_only_pops_the_named_rule() {
        let mut stack: RuleStack<PathRule> = RuleStack::new();
        stack.push(PathRule::new("/p")).unwrap();

        assert!(stack.pop_matching(&PathRule::new("/q")).is_none());
        assert_eq!(stack.depth(), 1);

        let frame = stack.pop_matching(&PathRule::new("/p")).unwrap();
        assert_eq!(frame.rule, PathRule::new("/p"));
        assert!(stack.is_empty());
    }

    #[test]
    fn granted_bit_tracks_table_commit() {
        let mut stack: RuleStack<PathRule> = RuleStack::new();
        stack.push(PathRule::new("/p")).unwrap();
        assert!(!stack.top_granted());

        stack.mark_top_granted();
        assert!(stack.top_granted());
    }

    #[test]
    fn sessions_get_unique_ids() {
        let a: LockSession<PathRule> = LockSession::new();
        let b: LockSession<PathRule> = LockSession::new();
        assert_ne!(a.id(), b.id());
        assert!(a.is_idle());
        assert!(!a.release_owed());
    }

    #[test]
    fn describe_renders_bottom_to_top() {
        let mut stack: RuleStack<PathRule> = RuleStack::new();
        assert_eq!(stack.describe(), "<no rules held>");

        stack.push(PathRule::new("/a")).unwrap();
        stack.push(PathRule::new("/a/b")).unwrap();
        assert_eq!(stack.describe(), "/a > /a/b");
    }
}
