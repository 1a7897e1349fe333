//! Work manager orchestration over the rule stack, lock table and tree lock.

use crate::config::ManagerConfig;
use crate::error::Result;
use crate::rules::Rule;
use crate::session::LockSession;
use crate::table::{CancelToken, LockInfo, LockTable};
use crate::tree_lock::{NotificationGuard, TreeLock};
use tracing::{debug, warn};

/// Orchestrator for rule-scoped exclusive access to the workspace tree.
///
/// Shared by reference across all scheduler threads; per-task state lives
/// in the [`LockSession`] each caller threads through the protocol.
#[derive(Debug)]
pub struct WorkManager<R: Rule> {
    table: LockTable<R>,
    tree_lock: TreeLock,
    config: ManagerConfig,
}

impl<R: Rule> WorkManager<R> {
    /// Create a manager with default configuration.
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    /// Create a manager with the given configuration.
    pub fn with_config(config: ManagerConfig) -> Self {
        Self {
            table: LockTable::new(),
            tree_lock: TreeLock::new(),
            config,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Create a lock session owned by the calling thread.
    pub fn new_session(&self) -> LockSession<R> {
        LockSession::new()
    }

    /// Acquire `rule` for the session before running a unit of work.
    ///
    /// Blocks while another session holds a related rule. On error the
    /// caller must invoke [`check_in_failed`](Self::check_in_failed) if its
    /// own logic cannot determine whether the rule was granted.
    pub fn check_in(&self, session: &mut LockSession<R>, rule: R) -> Result<()> {
        self.check_in_cancellable(session, rule, &CancelToken::new())
    }

    /// [`check_in`](Self::check_in) with cooperative cancellation of the
    /// blocking wait.
    pub fn check_in_cancellable(
        &self,
        session: &mut LockSession<R>,
        rule: R,
        cancel: &CancelToken,
    ) -> Result<()> {
        // Steps 1 and 2: validate nesting and push. A validation failure
        // returns before anything is touched and before the marker is set.
        session.stack_mut().push(rule.clone())?;

        // The push succeeded: from this exact point a matching release is
        // owed, recorded on the session and nowhere else.
        session.set_release_owed(true);

        // Step 3: acquire in the table; may block, may be interrupted. On
        // failure the marker stays set and check_in_failed settles the debt.
        self.table.acquire(
            &rule,
            session.id(),
            session.thread_label(),
            cancel,
            &self.config,
        )?;

        // Step 4: commit.
        session.stack_mut().mark_top_granted();
        debug!(rule = %rule, session = session.id(), "check-in complete");
        Ok(())
    }

    /// Release `rule` after a unit of work completed normally.
    ///
    /// The rule must be the session's innermost held rule; releases mirror
    /// acquisitions in exact reverse order.
    pub fn check_out(&self, session: &mut LockSession<R>, rule: &R) -> Result<()> {
        // Validate before mutating anything, so a mismatched release
        // leaves both the stack and the table untouched.
        session.stack().expect_top(rule)?;

        if session.stack().top_granted() {
            self.table.release(rule, session.id())?;
        }

        session.stack_mut().pop(rule)?;
        session.set_release_owed(false);
        debug!(rule = %rule, session = session.id(), "check-out complete");
        Ok(())
    }

    /// Settle a check-in whose caller hit a failure it cannot attribute.
    ///
    /// Returns `true` when a release was owed and has been performed,
    /// `false` when the failed check-in never got far enough to owe one.
    ///
    /// The decision reads the session's release-owed marker and nothing
    /// else. In particular the tree lock is never consulted: a concurrent
    /// notification broadcast may hold it at this very moment (the failing
    /// operation itself may have triggered that broadcast), and its state
    /// says nothing about whether *this* session's acquisition happened.
    /// Never blocks.
    pub fn check_in_failed(&self, session: &mut LockSession<R>, rule: &R) -> bool {
        if !session.release_owed() {
            return false;
        }

        match session.stack_mut().pop_matching(rule) {
            Some(frame) => {
                if frame.granted
                    && let Err(e) = self.table.release(rule, session.id())
                {
                    warn!(
                        rule = %rule,
                        session = session.id(),
                        error = %e,
                        "failed to release lock table entry during check-in recovery"
                    );
                }
            }
            None => {
                warn!(
                    rule = %rule,
                    session = session.id(),
                    stack = %session.stack().describe(),
                    "release owed but the innermost frame does not match; stack unchanged"
                );
            }
        }

        session.set_release_owed(false);
        debug!(rule = %rule, session = session.id(), "recovered from failed check-in");
        true
    }

    /// Freeze the tree for a structural-change notification broadcast.
    ///
    /// Called by the notification dispatcher around listener callbacks.
    /// The returned guard unlocks on drop.
    pub fn lock_for_notification(&self) -> Result<NotificationGuard<'_>> {
        self.tree_lock.lock_for_notification()
    }

    /// Whether the tree is currently frozen for a broadcast.
    pub fn is_tree_locked(&self) -> bool {
        self.tree_lock.is_locked()
    }

    /// Fail fast if the tree is frozen. Structural mutators call this
    /// before touching the tree.
    pub fn ensure_tree_unlocked(&self) -> Result<()> {
        self.tree_lock.ensure_unlocked()
    }

    /// Snapshot of all active rule holds, for diagnostics.
    pub fn active_locks(&self) -> Vec<LockInfo> {
        self.table.active_locks(self.config.stale_hold_minutes)
    }
}

impl<R: Rule> Default for WorkManager<R> {
    fn default() -> Self {
        Self::new()
    }
}
