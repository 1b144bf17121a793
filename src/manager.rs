use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::error::LockError;
use crate::mode::LockMode;
use crate::path::ScopePath;
use crate::tree::{LockId, LockTree};

/// Opaque handle to a granted lock.
///
/// Returned by [`ScopeLockManager::acquire`] and consumed by
/// [`ScopeLockManager::release`]. Deliberately not `Clone`: one grant, one
/// handle.
#[derive(Debug)]
pub struct ScopeLock {
    id: LockId,
    path: ScopePath,
    mode: LockMode,
}

impl ScopeLock {
    /// The scope this lock covers.
    pub fn path(&self) -> &ScopePath {
        &self.path
    }

    /// Shared or exclusive.
    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

struct PendingRequest {
    path: ScopePath,
    mode: LockMode,
    grant_tx: oneshot::Sender<ScopeLock>,
}

type Grant = (oneshot::Sender<ScopeLock>, ScopeLock);

#[derive(Default)]
struct State {
    tree: LockTree,
    queue: VecDeque<PendingRequest>,
}

impl State {
    /// One scheduling pass: scan the queue oldest→newest and grant every
    /// request whose scope is available, removing it from the queue.
    ///
    /// An unavailable request stays in place and does not block younger
    /// non-conflicting requests behind it. Runs to completion under the
    /// state mutex, so there is exactly one active pass at a time; granted
    /// waiters are notified by the caller after the mutex is dropped.
    fn drain(&mut self) -> Vec<Grant> {
        let mut granted = Vec::new();
        let mut index = 0;
        while index < self.queue.len() {
            // A dropped waiter has no observer left; discard the entry
            // rather than granting a lock nobody can release.
            if self.queue[index].grant_tx.is_closed() {
                self.queue.remove(index);
                continue;
            }
            if self.tree.is_available(&self.queue[index].path, self.queue[index].mode) {
                let request = match self.queue.remove(index) {
                    Some(request) => request,
                    None => unreachable!("scanned index is in bounds"),
                };
                let id = self.tree.grant(&request.path, request.mode);
                granted.push((
                    request.grant_tx,
                    ScopeLock {
                        id,
                        path: request.path,
                        mode: request.mode,
                    },
                ));
            } else {
                trace!(
                    scope = %self.queue[index].path,
                    mode = ?self.queue[index].mode,
                    "scope contended; request stays queued"
                );
                index += 1;
            }
        }
        granted
    }
}

/// Serializes operations against a tree-structured resource by granting
/// shared or exclusive locks on scopes (subtrees) of it.
///
/// One manager owns one lock tree and one request queue; create it once at
/// process start and hand out references (it is `Send + Sync`). Both API
/// surfaces — explicit [`acquire`](Self::acquire)/[`release`](Self::release)
/// and [`run_exclusively`](Self::run_exclusively) — go through the same
/// scheduler.
///
/// A granted lock at path `P` excludes conflicting locks at every ancestor
/// of `P`, at `P` itself, and at every descendant of `P` (whole-subtree
/// isolation). Conflicts follow the usual reader/writer rules: any number of
/// shared locks may overlap, an exclusive lock overlaps with nothing.
///
/// # Ordering
///
/// Queued requests are scanned in arrival order, but a younger request whose
/// scope does not conflict is granted even while an older conflicting one
/// still waits — best-effort scheduling, not strict FIFO. There is no
/// fairness guarantee: a scope that is perpetually re-acquired can starve a
/// waiter indefinitely. There are likewise no timeouts; layer
/// `tokio::time::timeout` or similar on top if you need one.
///
/// ```rust
/// use scope_lock::{LockMode, ScopeLockManager};
///
/// # tokio_test::block_on(async {
/// let manager = ScopeLockManager::new();
///
/// // A writer takes the whole "page" subtree...
/// let lock = manager.acquire(["postType", "page"], LockMode::Exclusive).await;
/// // ...so nothing inside it can be locked until the writer is done.
/// assert!(!manager.is_available(["postType", "page", "42"], LockMode::Shared));
///
/// manager.release(&lock).unwrap();
/// assert!(manager.is_available(["postType", "page", "42"], LockMode::Shared));
/// # });
/// ```
#[derive(Default)]
pub struct ScopeLockManager {
    state: Mutex<State>,
}

impl ScopeLockManager {
    /// A manager with an empty tree and queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for a lock on `path` in `mode`.
    ///
    /// Never fails: the returned future resolves once the scope becomes
    /// available, which may be immediately. Like any future, nothing is
    /// queued until it is first polled; dropping it before it resolves
    /// abandons the request without leaking a grant.
    pub async fn acquire(&self, path: impl Into<ScopePath>, mode: LockMode) -> ScopeLock {
        let path = path.into();
        trace!(scope = %path, ?mode, "lock requested");
        let (grant_tx, grant_rx) = oneshot::channel();
        let granted = {
            let mut state = self.lock_state();
            state.queue.push_back(PendingRequest { path, mode, grant_tx });
            state.drain()
        };
        self.notify(granted);
        // The guard covers the window where a grant has been delivered into
        // the channel but this future is dropped before observing it; its
        // Drop puts the grant back. The queue side handles the other
        // direction (sender still queued, or send failing outright).
        let mut pending = PendingGrant {
            manager: self,
            grant_rx,
            resolved: false,
        };
        let lock = match (&mut pending.grant_rx).await {
            Ok(lock) => lock,
            // The queue holds the sender until the grant is delivered, and
            // the manager outlives this borrow of it.
            Err(_) => unreachable!("pending lock request lost its grant channel"),
        };
        pending.resolved = true;
        lock
    }

    /// Take a lock on `path` in `mode` only if it is available right now.
    ///
    /// Does not queue on failure. Because scheduling is best-effort, this
    /// may succeed even while older conflicting requests are still waiting
    /// on other scopes.
    pub fn try_acquire(&self, path: impl Into<ScopePath>, mode: LockMode) -> Option<ScopeLock> {
        let path = path.into();
        let mut state = self.lock_state();
        if !state.tree.is_available(&path, mode) {
            return None;
        }
        let id = state.tree.grant(&path, mode);
        Some(ScopeLock { id, path, mode })
    }

    /// Release a held lock and grant whatever its departure unblocks.
    ///
    /// Releasing the same handle twice, or a handle from another manager,
    /// reports [`LockError::InvalidRelease`] and changes nothing.
    pub fn release(&self, lock: &ScopeLock) -> Result<(), LockError> {
        let granted = {
            let mut state = self.lock_state();
            state.tree.release(lock.id, &lock.path)?;
            state.drain()
        };
        self.notify(granted);
        Ok(())
    }

    /// Acquire, run `unit_of_work`, release — with the release guaranteed to
    /// happen exactly once however the work settles, including a panic or
    /// the composed future being dropped mid-work.
    ///
    /// The work's output (typically a `Result`) propagates unchanged.
    ///
    /// ```rust
    /// use scope_lock::{LockMode, ScopeLockManager};
    ///
    /// # tokio_test::block_on(async {
    /// let manager = ScopeLockManager::new();
    /// let saved: Result<u64, String> = manager
    ///     .run_exclusively(["postType", "page", "42"], LockMode::Exclusive, || async {
    ///         // mutate the protected store here
    ///         Ok(42)
    ///     })
    ///     .await;
    /// assert_eq!(saved, Ok(42));
    /// assert_eq!(manager.held_count(), 0);
    /// # });
    /// ```
    pub async fn run_exclusively<F, Fut>(
        &self,
        path: impl Into<ScopePath>,
        mode: LockMode,
        unit_of_work: F,
    ) -> Fut::Output
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let lock = self.acquire(path, mode).await;
        let mut guard = ReleaseOnDrop {
            manager: self,
            lock: Some(lock),
        };
        let output = unit_of_work().await;
        guard.release_now();
        output
    }

    /// Whether a lock on `path` in `mode` could be granted right now.
    ///
    /// A probe only: the answer can be stale by the time the caller acts on
    /// it. Use [`try_acquire`](Self::try_acquire) to probe and take in one
    /// step.
    pub fn is_available(&self, path: impl Into<ScopePath>, mode: LockMode) -> bool {
        self.lock_state().tree.is_available(&path.into(), mode)
    }

    /// Locks currently held across the whole tree.
    pub fn held_count(&self) -> usize {
        self.lock_state().tree.held_count()
    }

    /// Requests waiting in the queue.
    pub fn pending_count(&self) -> usize {
        self.lock_state().queue.len()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Deliver grants after a scheduling pass, outside the state mutex.
    ///
    /// A waiter that vanished between grant and delivery gets its grant
    /// rolled back, and the freed scope is re-drained. Iterative on purpose:
    /// a long release chain must not recurse.
    fn notify(&self, mut granted: Vec<Grant>) {
        while !granted.is_empty() {
            let mut regrants = Vec::new();
            for (grant_tx, lock) in granted {
                if let Err(lock) = grant_tx.send(lock) {
                    debug!(scope = %lock.path, "grant abandoned before delivery; rolling back");
                    let mut state = self.lock_state();
                    let rolled_back = state.tree.release(lock.id, &lock.path);
                    debug_assert!(rolled_back.is_ok(), "rolled-back grant was not held");
                    regrants.extend(state.drain());
                }
            }
            granted = regrants;
        }
    }
}

/// Rolls back a grant that was delivered to an `acquire` future which was
/// then dropped without observing it. Without this, the `ScopeLock` would be
/// destroyed inside the channel while the tree still records it as held,
/// wedging the scope forever.
struct PendingGrant<'a> {
    manager: &'a ScopeLockManager,
    grant_rx: oneshot::Receiver<ScopeLock>,
    resolved: bool,
}

impl Drop for PendingGrant<'_> {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        // Closing the receiver and draining it is atomic with respect to the
        // sender: either the grant landed here (roll it back and re-drain),
        // or the queue side sees the send fail and rolls back itself.
        if let Ok(lock) = self.grant_rx.try_recv() {
            debug!(scope = %lock.path, "grant delivered to a dropped waiter; rolling back");
            let released = self.manager.release(&lock);
            debug_assert!(released.is_ok(), "rolled-back grant was not held");
        }
    }
}

/// Releases a granted lock when dropped, unless already released.
/// Panic- and cancellation-safety for `run_exclusively`.
struct ReleaseOnDrop<'a> {
    manager: &'a ScopeLockManager,
    lock: Option<ScopeLock>,
}

impl ReleaseOnDrop<'_> {
    fn release_now(&mut self) {
        if let Some(lock) = self.lock.take() {
            let released = self.manager.release(&lock);
            debug_assert!(released.is_ok(), "run_exclusively released its lock twice");
        }
    }
}

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        self.release_now();
    }
}
