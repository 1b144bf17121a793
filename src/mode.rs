/// How a scope is locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Shared lock. Coexists with other shared locks on the same
    /// ancestor/descendant span; excludes exclusive locks.
    Shared,
    /// Exclusive lock. Excludes every other lock, shared or exclusive,
    /// on the same ancestor/descendant span.
    Exclusive,
}

impl LockMode {
    /// Whether a request in this mode conflicts with an already-held lock.
    ///
    /// Shared vs shared is the only compatible pairing.
    pub(crate) fn conflicts_with(self, held: LockMode) -> bool {
        self == LockMode::Exclusive || held == LockMode::Exclusive
    }
}

#[cfg(test)]
mod tests {
    use super::LockMode::{Exclusive, Shared};

    #[test]
    fn only_shared_pairs_are_compatible() {
        assert!(!Shared.conflicts_with(Shared));
        assert!(Shared.conflicts_with(Exclusive));
        assert!(Exclusive.conflicts_with(Shared));
        assert!(Exclusive.conflicts_with(Exclusive));
    }
}
