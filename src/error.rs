//! Error types for the bole lock manager.
//!
//! Uses thiserror for derive macros and provides diagnosable error messages:
//! programming errors (illegal nesting, unmatched release) carry the
//! offending rule and the current rule stack so the caller invariant
//! violation can be traced to its source.

use thiserror::Error;

/// Main error type for lock manager operations.
///
/// Contention (blocking inside lock table acquisition) is expected
/// steady-state behavior and is deliberately not represented here.
#[derive(Error, Debug)]
pub enum LockError {
    /// A rule was acquired that is not contained by the rule currently on
    /// top of the session's stack. Caller invariant violation; not retried.
    #[error("illegal rule nesting: {0}")]
    IllegalNesting(String),

    /// A rule was released out of order, or released without a matching
    /// acquisition. Caller invariant violation; not retried.
    #[error("unmatched rule release: {0}")]
    UnmatchedRelease(String),

    /// A structural mutation was attempted while the tree is frozen for a
    /// change-notification broadcast. Fails fast instead of blocking.
    #[error("workspace tree is locked for notification: {0}")]
    TreeLocked(String),

    /// A blocked rule acquisition was cancelled before it was granted.
    #[error("rule acquisition interrupted: {0}")]
    Interrupted(String),

    /// Configuration could not be parsed or failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal failure outside the locking protocol (e.g., a diagnostics
    /// serialization problem).
    #[error("{0}")]
    Internal(String),
}

impl LockError {
    /// Whether this error indicates a caller invariant violation, as opposed
    /// to a recoverable runtime condition.
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            LockError::IllegalNesting(_) | LockError::UnmatchedRelease(_)
        )
    }
}

/// Result type alias for lock manager operations.
pub type Result<T> = std::result::Result<T, LockError>;
