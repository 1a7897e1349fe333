//! Lock table types and diagnostic structures.

use crate::error::{LockError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag for a blocked acquisition.
///
/// Clones share the same flag. Cancelling wakes the blocked thread at its
/// next re-check and makes the acquisition fail with
/// [`LockError::Interrupted`](crate::error::LockError::Interrupted).
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the acquisition using this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Format the elapsed time since `since` as a human-readable age.
pub(crate) fn age_string(since: DateTime<Utc>) -> String {
    let age: Duration = Utc::now().signed_duration_since(since);
    let minutes = age.num_minutes();
    let hours = age.num_hours();
    let days = age.num_days();

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}

/// Information about an active lock table entry.
#[derive(Debug, Clone, Serialize)]
pub struct LockInfo {
    /// The held rule, rendered.
    pub rule: String,

    /// Label of the owning thread.
    pub owner: String,

    /// Id of the owning session.
    pub session: u64,

    /// Nesting depth of the hold.
    pub depth: usize,

    /// When the rule was first acquired (RFC3339).
    pub acquired_at: DateTime<Utc>,

    /// Whether the hold has outlived the configured staleness threshold.
    pub is_stale: bool,
}

impl LockInfo {
    /// How long the rule has been held.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.acquired_at)
    }

    /// Format the hold age as a human-readable string.
    pub fn age_string(&self) -> String {
        age_string(self.acquired_at)
    }

    /// Serialize to JSON for diagnostic dumps.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| LockError::Internal(format!("failed to serialize lock info: {}", e)))
    }
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (owner: {}, age: {}, depth: {}{})",
            self.rule,
            self.owner,
            self.age_string(),
            self.depth,
            if self.is_stale { ", STALE" } else { "" }
        )
    }
}
