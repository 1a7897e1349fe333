//! Process-wide lock table for scheduling rules.
//!
//! The table maps each active rule to its exclusive holder and is the only
//! place a thread may block. Acquisition follows the classic monitor
//! pattern: waiters sleep on a condition variable and re-validate the
//! conflict set after every wakeup, so a woken waiter that lost the race
//! simply goes back to sleep.
//!
//! # Exclusion policy
//!
//! Two sessions may never simultaneously hold rules that are related,
//! conflicting or nested either way. A session that already holds a rule
//! containing the requested one is granted immediately (the outer grant
//! covers the inner), tracked as a nesting depth on the existing entry.
//! Independent rules share no synchronization at all.
//!
//! # Interruption
//!
//! Waits are sliced so a [`CancelToken`] can interrupt a blocked
//! acquisition. An interrupted acquire returns an error and leaves no entry
//! behind; the session-level cleanup decides what else is owed.

mod operations;
mod types;


// Re-export public API
pub use operations::LockTable;
pub use types::{CancelToken, LockInfo};

pub(crate) use types::age_string;
