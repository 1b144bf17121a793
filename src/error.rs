use thiserror::Error;

use crate::path::ScopePath;

/// Errors reported by [`ScopeLockManager`](crate::ScopeLockManager).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LockError {
    /// The handle does not correspond to a currently held lock: either it
    /// was already released, or it came from a different manager.
    /// Non-fatal; the manager's state is unchanged.
    #[error("lock at `{0}` is not currently held (double release or foreign handle)")]
    InvalidRelease(ScopePath),
}
