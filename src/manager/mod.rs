//! Work manager: the check-in / check-out / check-in-failed protocol.
//!
//! The [`WorkManager`] ties the rule stack, the lock table and the tree
//! lock together. Per session, it is a small state machine:
//!
//! ```text
//! IDLE ──check_in──▶ ACQUIRING ──grant──▶ HELD ──check_out──▶ IDLE
//!                        │
//!                        └──failure──▶ FAILED ──check_in_failed──▶ IDLE
//! ```
//!
//! `check_in` proceeds in enumerated steps (validate → push → acquire →
//! commit) so the cleanup path can tell exactly how far a failed attempt
//! progressed:
//!
//! 1. Validate nesting against the session's stack. Failure touches
//!    nothing.
//! 2. Push the frame and set the session's release-owed marker. From this
//!    point a matching release is owed, whatever happens next.
//! 3. Acquire the rule in the lock table. This may block on a conflicting
//!    holder and may be interrupted.
//! 4. Mark the frame granted.
//!
//! `check_in_failed` is the cleanup path the scheduler invokes when a later
//! step threw and it cannot tell whether the rule was actually granted. The
//! decision is read from the session's release-owed marker alone, never
//! from the tree lock, which a concurrent notification broadcast can
//! legitimately hold at that very moment.

mod operations;


// Re-export public API
pub use operations::WorkManager;
