//! Hierarchical **scoped lock manager**: shared/exclusive async locks over
//! subtrees of a tree-structured resource.
//!
//! Callers name the subtree ("scope") an operation touches as a path of
//! string segments — e.g. `["postType", "page", "42"]` — and the manager
//! grants the lock once nothing conflicting is held anywhere on that path's
//! ancestor chain or inside its subtree (**whole-subtree isolation**).
//! Conflicting requests wait in a queue and are granted as releases free
//! their scopes. Deadlock is prevented by construction: a request holds
//! nothing while it waits, so there is never a cycle to detect.
//!
//! **Runtime-agnostic** — waiters are woken through `tokio::sync` oneshot
//! channels, which work on any executor; the crate never spawns tasks or
//! touches a reactor.
//!
//! # Quick Start
//!
//! ```rust
//! use scope_lock::{LockMode, ScopeLockManager};
//!
//! # tokio_test::block_on(async {
//! let manager = ScopeLockManager::new();
//!
//! // Exclusive on the "page" subtree blocks everything inside it...
//! let lock = manager.acquire(["postType", "page"], LockMode::Exclusive).await;
//! assert!(!manager.is_available(["postType", "page", "42"], LockMode::Shared));
//! // ...and everything above it.
//! assert!(!manager.is_available(["postType"], LockMode::Shared));
//!
//! // Unrelated scopes are untouched.
//! assert!(manager.is_available(["taxonomy", "tag"], LockMode::Exclusive));
//!
//! manager.release(&lock).unwrap();
//! # });
//! ```
//!
//! # Running work under a lock
//!
//! [`ScopeLockManager::run_exclusively`] wraps acquire → work → release, with
//! the release guaranteed exactly once whether the work succeeds, fails, or
//! is cancelled:
//!
//! ```rust
//! use scope_lock::{LockMode, ScopeLockManager};
//!
//! # tokio_test::block_on(async {
//! let manager = ScopeLockManager::new();
//!
//! let outcome: Result<&str, &str> = manager
//!     .run_exclusively(["postType", "page", "42"], LockMode::Exclusive, || async {
//!         Err("save failed")
//!     })
//!     .await;
//!
//! // The failure propagates unchanged and the lock is gone.
//! assert_eq!(outcome, Err("save failed"));
//! assert_eq!(manager.held_count(), 0);
//! # });
//! ```
//!
//! # Shared readers
//!
//! ```rust
//! use scope_lock::{LockMode, ScopeLockManager};
//!
//! # tokio_test::block_on(async {
//! let manager = ScopeLockManager::new();
//!
//! let a = manager.acquire(["config"], LockMode::Shared).await;
//! let b = manager.acquire(["config"], LockMode::Shared).await; // coexists
//!
//! // A writer has to wait for both readers.
//! assert!(!manager.is_available(["config"], LockMode::Exclusive));
//!
//! manager.release(&a).unwrap();
//! manager.release(&b).unwrap();
//! assert!(manager.is_available(["config"], LockMode::Exclusive));
//! # });
//! ```
//!
//! # Ordering and starvation
//!
//! The scheduler scans waiters oldest-first but grants any request whose
//! scope is free, so a younger non-conflicting request overtakes an older
//! blocked one. This is best-effort scheduling, not strict FIFO, and a
//! perpetually re-acquired scope can starve a waiter; see
//! [`ScopeLockManager`] for details.

mod error;
mod manager;
mod mode;
mod path;
mod tree;

pub use error::LockError;
pub use manager::{ScopeLock, ScopeLockManager};
pub use mode::LockMode;
pub use path::ScopePath;
