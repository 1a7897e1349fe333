//! The process-wide tree lock.
//!
//! While a structural-change notification is being broadcast, the resource
//! tree's shape must stay frozen: listener callbacks walk the tree and must
//! observe a stable snapshot. The tree lock is a single exclusive flag,
//! orthogonal to the rule table: holding a rule does not imply holding the
//! tree lock, and vice versa.
//!
//! Structural mutators call [`TreeLock::ensure_unlocked`] before touching
//! the tree and fail fast with `TreeLocked` instead of blocking: listener
//! callbacks may themselves attempt further resource operations, and
//! blocking here would deadlock the notification thread against itself.
//!
//! # RAII Guard
//!
//! [`TreeLock::lock_for_notification`] returns a [`NotificationGuard`] that
//! unlocks the tree when dropped, so a panicking listener cannot leave the
//! tree frozen. Callers that want to unlock explicitly use
//! [`NotificationGuard::unlock`].

use crate::error::{LockError, Result};
use crate::session::current_thread_label;
use crate::table::age_string;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Clone)]
struct Holder {
    label: String,
    locked_at: DateTime<Utc>,
}

impl Holder {
    fn describe(&self) -> String {
        format!("held by {} for {}", self.label, age_string(self.locked_at))
    }
}

/// Process-wide flag blocking structural mutation during notification
/// broadcast.
#[derive(Debug, Default)]
pub struct TreeLock {
    holder: Mutex<Option<Holder>>,
}

impl TreeLock {
    /// Create an unlocked tree lock.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_holder(&self) -> MutexGuard<'_, Option<Holder>> {
        self.holder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Freeze the tree for a notification broadcast.
    ///
    /// Fails fast with `TreeLocked` if the tree is already frozen; the
    /// notification dispatcher must never nest broadcasts, and blocking
    /// here could deadlock it against itself.
    pub fn lock_for_notification(&self) -> Result<NotificationGuard<'_>> {
        let mut holder = self.lock_holder();
        if let Some(current) = holder.as_ref() {
            return Err(LockError::TreeLocked(format!(
                "cannot lock for notification: already {}",
                current.describe()
            )));
        }

        *holder = Some(Holder {
            label: current_thread_label(),
            locked_at: Utc::now(),
        });
        debug!("tree locked for notification");
        Ok(NotificationGuard {
            lock: self,
            released: false,
        })
    }

    /// Whether the tree is currently frozen.
    pub fn is_locked(&self) -> bool {
        self.lock_holder().is_some()
    }

    /// Fail fast if the tree is frozen. Structural mutators call this
    /// before touching the tree; it never blocks.
    pub fn ensure_unlocked(&self) -> Result<()> {
        match self.lock_holder().as_ref() {
            Some(current) => Err(LockError::TreeLocked(current.describe())),
            None => Ok(()),
        }
    }

    fn unlock(&self) {
        *self.lock_holder() = None;
        debug!("tree unlocked after notification");
    }
}

/// RAII guard for the tree lock.
///
/// When dropped, the tree is unlocked.
#[derive(Debug)]
pub struct NotificationGuard<'a> {
    lock: &'a TreeLock,
    released: bool,
}

impl NotificationGuard<'_> {
    /// Unlock the tree before the guard goes out of scope.
    pub fn unlock(mut self) {
        self.released = true;
        self.lock.unlock();
    }
}

impl Drop for NotificationGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.lock.unlock();
        }
    }
}
