//! Lock table acquisition, release, and listing operations.

use super::types::{CancelToken, LockInfo};
use crate::config::ManagerConfig;
use crate::error::{LockError, Result};
use crate::rules::Rule;
use chrono::{DateTime, Utc};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One active hold in the table.
#[derive(Debug)]
struct Entry<R> {
    rule: R,
    owner: u64,
    owner_label: String,
    depth: usize,
    acquired_at: DateTime<Utc>,
}

/// Process-wide map from active rule to exclusive holder.
///
/// The entry list is guarded by a single mutex; waiters block on the
/// associated condition variable and re-validate the conflict set after
/// every wakeup. Entries are created by the first acquisition of a rule and
/// removed when the last nested hold is released.
#[derive(Debug)]
pub struct LockTable<R: Rule> {
    entries: Mutex<Vec<Entry<R>>>,
    released: Condvar,
}

impl<R: Rule> LockTable<R> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            released: Condvar::new(),
        }
    }

    // A poisoned mutex only means another thread panicked mid-update; the
    // entry list itself is always left consistent, so keep going.
    fn lock_entries(&self) -> MutexGuard<'_, Vec<Entry<R>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquire `rule` exclusively for `owner`, blocking while any other
    /// session holds a related rule.
    ///
    /// A session that already holds a rule containing `rule` is granted
    /// immediately; the covering entry's depth is bumped instead of creating
    /// a second entry. The wait is sliced by `config.wait_recheck_millis` so
    /// `cancel` can interrupt it; an interrupted acquisition returns
    /// [`LockError::Interrupted`] and leaves the table unchanged.
    pub(crate) fn acquire(
        &self,
        rule: &R,
        owner: u64,
        owner_label: &str,
        cancel: &CancelToken,
        config: &ManagerConfig,
    ) -> Result<()> {
        let wait_slice = Duration::from_millis(config.wait_recheck_millis);
        let warn_after = Duration::from_secs(config.long_wait_warning_secs);
        let started = Instant::now();
        let mut warned = false;

        let mut entries = self.lock_entries();
        loop {
            // Nested acquisition covered by this session's own outer grant.
            if let Some(entry) = entries
                .iter_mut()
                .find(|e| e.owner == owner && e.rule.contains(rule))
            {
                entry.depth += 1;
                debug!(
                    rule = %rule,
                    owner = owner_label,
                    depth = entry.depth,
                    "nested rule grant"
                );
                return Ok(());
            }

            let holder = entries
                .iter()
                .find(|e| e.owner != owner && !e.rule.is_independent(rule))
                .map(|e| e.owner_label.clone());

            match holder {
                None => {
                    entries.push(Entry {
                        rule: rule.clone(),
                        owner,
                        owner_label: owner_label.to_string(),
                        depth: 1,
                        acquired_at: Utc::now(),
                    });
                    debug!(rule = %rule, owner = owner_label, "rule granted");
                    return Ok(());
                }
                Some(holder_label) => {
                    if !warned && started.elapsed() >= warn_after {
                        warn!(
                            rule = %rule,
                            owner = owner_label,
                            holder = %holder_label,
                            waited_secs = started.elapsed().as_secs(),
                            "rule acquisition waiting on conflicting holder"
                        );
                        warned = true;
                    }
                }
            }

            let (guard, _timed_out) = self
                .released
                .wait_timeout(entries, wait_slice)
                .unwrap_or_else(PoisonError::into_inner);
            entries = guard;

            if cancel.is_cancelled() {
                debug!(rule = %rule, owner = owner_label, "rule acquisition cancelled");
                return Err(LockError::Interrupted(format!(
                    "cancelled while waiting for {}",
                    rule
                )));
            }
        }
    }

    /// Release one hold of `rule` by `owner`.
    ///
    /// Decrements the covering entry's depth; the entry is removed and
    /// waiters are woken when the depth reaches zero.
    pub(crate) fn release(&self, rule: &R, owner: u64) -> Result<()> {
        let mut entries = self.lock_entries();

        let Some(pos) = entries
            .iter()
            .position(|e| e.owner == owner && e.rule.contains(rule))
        else {
            return Err(LockError::UnmatchedRelease(format!(
                "no lock table entry covers {} for this session",
                rule
            )));
        };

        entries[pos].depth -= 1;
        if entries[pos].depth == 0 {
            let entry = entries.remove(pos);
            debug!(rule = %entry.rule, owner = %entry.owner_label, "rule released");
            self.released.notify_all();
        } else {
            debug!(
                rule = %rule,
                owner = %entries[pos].owner_label,
                depth = entries[pos].depth,
                "nested rule release"
            );
        }
        Ok(())
    }

    /// Label of the session holding a rule related to `rule`, if any.
    pub fn holder_of(&self, rule: &R) -> Option<String> {
        self.lock_entries()
            .iter()
            .find(|e| !e.rule.is_independent(rule))
            .map(|e| e.owner_label.clone())
    }

    /// Whether no rule is currently held.
    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    /// Snapshot of all active holds, sorted by rule for consistent output.
    pub fn active_locks(&self, stale_minutes: u32) -> Vec<LockInfo> {
        let mut locks: Vec<LockInfo> = self
            .lock_entries()
            .iter()
            .map(|e| {
                let age_minutes = Utc::now()
                    .signed_duration_since(e.acquired_at)
                    .num_minutes();
                LockInfo {
                    rule: e.rule.to_string(),
                    owner: e.owner_label.clone(),
                    session: e.owner,
                    depth: e.depth,
                    acquired_at: e.acquired_at,
                    is_stale: age_minutes > stale_minutes as i64,
                }
            })
            .collect();

        locks.sort_by(|a, b| a.rule.cmp(&b.rule));
        locks
    }
}

impl<R: Rule> Default for LockTable<R> {
    fn default() -> Self {
        Self::new()
    }
}
