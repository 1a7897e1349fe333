//! Scheduling-rule model for the lock manager.
//!
//! A rule is an opaque handle for the resource subtree an operation intends
//! to mutate. The lock manager never inspects a rule beyond two predicates:
//!
//! - **contains**: a reflexive, transitive partial order. A containing rule
//!   authorizes any work also valid under the rules it contains; a thread may
//!   only nest a narrower or equal rule under one it already holds.
//! - **conflicts**: a symmetric relation. Holders of conflicting rules must
//!   be serialized.
//!
//! Rules with no relation at all are *independent* and never synchronize.
//!
//! [`PathRule`] is the concrete rule over workspace resource paths: it covers
//! a set of path prefixes (usually one), contains whatever falls under those
//! prefixes, and conflicts on containment-free overlap. `combine` builds the
//! smallest rule covering two operands for operations that touch several
//! unrelated subtrees at once.

mod path;
mod rule;

#[cfg(test)]
mod tests;

// Re-export public API
pub use path::ResourcePath;
pub use rule::{PathRule, Rule};
