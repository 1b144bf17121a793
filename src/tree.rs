use std::collections::HashMap;

use tracing::trace;

use crate::error::LockError;
use crate::mode::LockMode;
use crate::path::ScopePath;

pub(crate) type LockId = u64;

/// A lock held at exactly one node.
#[derive(Debug, Clone, Copy)]
struct HeldLock {
    id: LockId,
    mode: LockMode,
}

#[derive(Debug, Default)]
struct LockNode {
    locks: Vec<HeldLock>,
    children: HashMap<String, LockNode>,
}

impl LockNode {
    fn conflicts_with(&self, requested: LockMode) -> bool {
        self.locks
            .iter()
            .any(|held| requested.conflicts_with(held.mode))
    }
}

/// Tree of lock nodes, built lazily as scope paths are referenced.
///
/// Nodes are never removed once created: an empty node is a few words of
/// memory and acts as a process-lifetime cache for re-referenced scopes.
#[derive(Debug, Default)]
pub(crate) struct LockTree {
    root: LockNode,
    next_id: LockId,
}

impl LockTree {
    /// Walk to the node for `path`, creating missing nodes along the way.
    fn node_for(&mut self, path: &ScopePath) -> &mut LockNode {
        let mut node = &mut self.root;
        for segment in path.segments() {
            node = node.children.entry(segment.clone()).or_default();
        }
        node
    }

    /// Whether a lock in `mode` could be granted at `path` right now.
    ///
    /// Unavailable iff a conflicting lock exists on the root→`path` walk or
    /// anywhere in the subtree under `path`. Checking both directions is
    /// what makes the lock scoped rather than keyed: an exclusive grant on
    /// `postType/page` must block a reader of `postType/page/42`, and a
    /// writer at `postType/page/42` must block a reader of the broader
    /// `postType/page`.
    pub(crate) fn is_available(&self, path: &ScopePath, mode: LockMode) -> bool {
        let mut node = &self.root;
        if node.conflicts_with(mode) {
            return false;
        }
        for segment in path.segments() {
            node = match node.children.get(segment) {
                Some(child) => child,
                // Never referenced below this point, so nothing is held there.
                None => return true,
            };
            if node.conflicts_with(mode) {
                return false;
            }
        }
        // Descendant scan. Explicit stack: this runs inside the scheduler's
        // critical section and must not recurse on tree depth.
        let mut stack: Vec<&LockNode> = node.children.values().collect();
        while let Some(descendant) = stack.pop() {
            if descendant.conflicts_with(mode) {
                return false;
            }
            stack.extend(descendant.children.values());
        }
        true
    }

    /// Record a grant at `path` and return its id.
    ///
    /// The caller must have checked [`is_available`](Self::is_available)
    /// within the same scheduling pass; granting an unavailable scope is a
    /// scheduler bug, not a runtime condition.
    pub(crate) fn grant(&mut self, path: &ScopePath, mode: LockMode) -> LockId {
        debug_assert!(
            self.is_available(path, mode),
            "grant at `{path}` without an availability check"
        );
        let id = self.next_id;
        self.next_id += 1;
        self.node_for(path).locks.push(HeldLock { id, mode });
        trace!(scope = %path, ?mode, id, "lock granted");
        id
    }

    /// Remove a held lock. `InvalidRelease` if no lock with this id is held
    /// at `path`.
    pub(crate) fn release(&mut self, id: LockId, path: &ScopePath) -> Result<(), LockError> {
        let mut node = &mut self.root;
        for segment in path.segments() {
            node = match node.children.get_mut(segment) {
                Some(child) => child,
                None => return Err(LockError::InvalidRelease(path.clone())),
            };
        }
        match node.locks.iter().position(|held| held.id == id) {
            Some(index) => {
                node.locks.remove(index);
                trace!(scope = %path, id, "lock released");
                Ok(())
            }
            None => Err(LockError::InvalidRelease(path.clone())),
        }
    }

    /// Total locks currently held anywhere in the tree.
    pub(crate) fn held_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            count += node.locks.len();
            stack.extend(node.children.values());
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::LockMode::{Exclusive, Shared};

    fn path(segments: &[&str]) -> ScopePath {
        ScopePath::from(segments)
    }

    #[test]
    fn exclusive_excludes_everything_at_the_same_node() {
        let mut tree = LockTree::default();
        tree.grant(&path(&["x"]), Exclusive);

        assert!(!tree.is_available(&path(&["x"]), Exclusive));
        assert!(!tree.is_available(&path(&["x"]), Shared));
    }

    #[test]
    fn shared_locks_coexist() {
        let mut tree = LockTree::default();
        tree.grant(&path(&["x"]), Shared);

        assert!(tree.is_available(&path(&["x"]), Shared));
        assert!(!tree.is_available(&path(&["x"]), Exclusive));
    }

    #[test]
    fn held_ancestor_blocks_descendant() {
        let mut tree = LockTree::default();
        tree.grant(&path(&["postType", "page"]), Exclusive);

        assert!(!tree.is_available(&path(&["postType", "page", "42"]), Shared));
        assert!(!tree.is_available(&path(&["postType", "page", "42"]), Exclusive));
    }

    #[test]
    fn held_descendant_blocks_ancestor() {
        let mut tree = LockTree::default();
        tree.grant(&path(&["postType", "page", "42"]), Exclusive);

        assert!(!tree.is_available(&path(&["postType", "page"]), Shared));
        assert!(!tree.is_available(&path(&["postType"]), Exclusive));
        assert!(!tree.is_available(&ScopePath::root(), Shared));
    }

    #[test]
    fn shared_descendant_allows_shared_ancestor() {
        let mut tree = LockTree::default();
        tree.grant(&path(&["postType", "page", "42"]), Shared);

        assert!(tree.is_available(&path(&["postType", "page"]), Shared));
        assert!(!tree.is_available(&path(&["postType", "page"]), Exclusive));
    }

    #[test]
    fn sibling_scopes_are_independent() {
        let mut tree = LockTree::default();
        tree.grant(&path(&["a"]), Exclusive);

        assert!(tree.is_available(&path(&["b"]), Exclusive));
        assert!(tree.is_available(&path(&["b", "c"]), Shared));
    }

    #[test]
    fn release_restores_availability() {
        let mut tree = LockTree::default();
        let id = tree.grant(&path(&["x"]), Exclusive);
        assert!(!tree.is_available(&path(&["x"]), Shared));

        tree.release(id, &path(&["x"])).unwrap();
        assert!(tree.is_available(&path(&["x"]), Exclusive));
        assert_eq!(tree.held_count(), 0);
    }

    #[test]
    fn double_release_is_invalid() {
        let mut tree = LockTree::default();
        let id = tree.grant(&path(&["x"]), Exclusive);

        tree.release(id, &path(&["x"])).unwrap();
        assert_eq!(
            tree.release(id, &path(&["x"])),
            Err(LockError::InvalidRelease(path(&["x"])))
        );
    }

    #[test]
    fn release_at_unreferenced_path_is_invalid() {
        let mut tree = LockTree::default();
        assert_eq!(
            tree.release(7, &path(&["never", "seen"])),
            Err(LockError::InvalidRelease(path(&["never", "seen"])))
        );
    }

    #[test]
    fn nodes_survive_release_and_ids_stay_unique() {
        let mut tree = LockTree::default();
        let first = tree.grant(&path(&["x"]), Exclusive);
        tree.release(first, &path(&["x"])).unwrap();

        let second = tree.grant(&path(&["x"]), Exclusive);
        assert_ne!(first, second);
        // A stale handle with the old id must not release the new grant.
        assert!(tree.release(first, &path(&["x"])).is_err());
        assert_eq!(tree.held_count(), 1);
    }

    #[test]
    fn root_lock_blocks_the_whole_tree() {
        let mut tree = LockTree::default();
        tree.grant(&ScopePath::root(), Exclusive);

        assert!(!tree.is_available(&path(&["anything"]), Shared));
        assert!(!tree.is_available(&path(&["deep", "er", "still"]), Exclusive));
    }
}
