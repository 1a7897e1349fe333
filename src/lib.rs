//! Bole: hierarchical scheduling-rule lock manager for workspace resource trees.
//!
//! A workspace is a tree of resources (root, projects, folders, files)
//! mutated concurrently by background jobs, UI actions and refresh events.
//! This crate serializes mutation of overlapping subtrees while letting
//! unrelated subtrees proceed in parallel, freezes the tree's structural
//! shape while change notifications are broadcast, and recovers cleanly
//! when lock acquisition fails partway through: a lock acquired is never
//! left orphaned, and a lock never taken is never released twice.
//!
//! The external job scheduler drives the protocol: [`WorkManager::check_in`]
//! before a unit of work, [`WorkManager::check_out`] after it, and
//! [`WorkManager::check_in_failed`] when a failure leaves the scheduler
//! unable to tell whether the rule was actually granted. The notification
//! broadcaster freezes the tree with [`WorkManager::lock_for_notification`]
//! around listener dispatch.
//!
//! ```
//! use bole::{PathRule, WorkManager};
//!
//! let manager: WorkManager<PathRule> = WorkManager::new();
//! let rule = PathRule::new("/project/src/main.rs");
//!
//! let mut session = manager.new_session();
//! manager.check_in(&mut session, rule.clone())?;
//! // ... mutate the subtree under /project/src/main.rs ...
//! manager.check_out(&mut session, &rule)?;
//! # Ok::<(), bole::LockError>(())
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod rules;
pub mod session;
pub mod table;
pub mod tree_lock;

pub use config::ManagerConfig;
pub use error::{LockError, Result};
pub use manager::WorkManager;
pub use rules::{PathRule, ResourcePath, Rule};
pub use session::{HeldRule, LockSession, RuleStack};
pub use table::{CancelToken, LockInfo, LockTable};
pub use tree_lock::{NotificationGuard, TreeLock};
