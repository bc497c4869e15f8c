//! # Snapshotable Shared Values
//!
//! The reference-typed variant of [`Snapshotable`](super::Snapshotable): both
//! slots hold an `Arc<T>`.
//!
//! ## Ownership
//!
//! The live slot is swapped atomically. The snapshot slot keeps its `Arc`
//! until the next commit overwrites it, so a value replaced in the live slot
//! stays alive for as long as readers can still see it through `get`.
//! Identity, not `T: Eq`, decides compare-and-set and dirtiness.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::registry::{CommitCycle, CommitRegistry, CommitTarget};

/// A shared value with a racy live slot and a stable snapshot slot.
///
/// ## Usage
///
/// ```rust,ignore
/// let registry = CommitRegistry::new();
/// let name = SnapshotableArc::new(&registry, Arc::new(String::from("spawn")));
///
/// name.set(Arc::new(String::from("nether")));
/// assert_eq!(name.get().as_str(), "spawn");
///
/// registry.advance_all();
/// assert_eq!(name.get().as_str(), "nether");
/// ```
pub struct SnapshotableArc<T> {
    live: ArcSwap<T>,
    snapshot: ArcSwap<T>,
}

impl<T: Send + Sync + 'static> SnapshotableArc<T> {
    /// Creates a value and registers it with `registry`.
    #[must_use]
    pub fn new(registry: &CommitRegistry, initial: Arc<T>) -> Arc<Self> {
        let value = Arc::new(Self::standalone(initial));
        registry.register(&value);
        value
    }

    /// Creates a value and registers it, wrapping `initial` in an `Arc`.
    #[must_use]
    pub fn from_pointee(registry: &CommitRegistry, initial: T) -> Arc<Self> {
        Self::new(registry, Arc::new(initial))
    }
}

impl<T> SnapshotableArc<T> {
    /// Creates a value that belongs to no registry.
    #[must_use]
    pub fn standalone(initial: Arc<T>) -> Self {
        Self {
            live: ArcSwap::new(Arc::clone(&initial)),
            snapshot: ArcSwap::new(initial),
        }
    }

    /// **Delayed write.** Stores `value` into the live slot.
    ///
    /// Last store to land before the commit wins.
    #[inline]
    pub fn set(&self, value: Arc<T>) {
        self.live.store(value);
    }

    /// **Delayed write.** Stores `next` iff the live slot holds exactly
    /// `expected` (same allocation).
    ///
    /// Returns `false` and leaves the live slot unchanged otherwise.
    pub fn compare_and_set(&self, expected: &Arc<T>, next: Arc<T>) -> bool {
        let previous = self.live.compare_and_swap(expected, next);
        Arc::ptr_eq(&previous, expected)
    }

    /// **Delayed write.** Replaces the live value with `f(current)` until no
    /// other writer interferes, returning the value it replaced.
    ///
    /// `f` may run several times under contention.
    pub fn update<F>(&self, mut f: F) -> Arc<T>
    where
        F: FnMut(&T) -> T,
    {
        self.live.rcu(|current| Arc::new(f(&**current)))
    }

    /// **Stable read.** Returns the value as of the last completed commit.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Arc<T> {
        self.snapshot.load_full()
    }

    /// **Live read.** Returns the current live value. Diagnostic only.
    #[inline]
    #[must_use]
    pub fn get_live(&self) -> Arc<T> {
        self.live.load_full()
    }

    /// **Live read.** Whether the live slot holds a different allocation
    /// than the snapshot.
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !Arc::ptr_eq(&self.live.load(), &self.snapshot.load())
    }
}

impl<T: Send + Sync> CommitTarget for SnapshotableArc<T> {
    fn copy_snapshot(&self, _cycle: &CommitCycle) {
        self.snapshot.store(self.live.load_full());
    }

    fn is_dirty(&self) -> bool {
        SnapshotableArc::is_dirty(self)
    }
}

impl<T: fmt::Debug> fmt::Debug for SnapshotableArc<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotableArc")
            .field("live", &self.live.load_full())
            .field("snapshot", &self.snapshot.load_full())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_is_delayed_until_commit() {
        let registry = CommitRegistry::new();
        let name = SnapshotableArc::from_pointee(&registry, String::from("spawn"));

        name.set(Arc::new(String::from("nether")));
        assert_eq!(name.get().as_str(), "spawn");
        assert_eq!(name.get_live().as_str(), "nether");

        registry.advance_all();
        assert_eq!(name.get().as_str(), "nether");
    }

    #[test]
    fn test_compare_and_set_uses_identity() {
        let registry = CommitRegistry::new();
        let first = Arc::new(7_u32);
        let value = SnapshotableArc::new(&registry, Arc::clone(&first));

        // Equal contents, different allocation
        assert!(!value.compare_and_set(&Arc::new(7), Arc::new(8)));
        assert!(Arc::ptr_eq(&value.get_live(), &first));
        assert!(!value.is_dirty());

        assert!(value.compare_and_set(&first, Arc::new(9)));
        assert_eq!(*value.get_live(), 9);
        assert!(value.is_dirty());

        // Back to the committed allocation
        let nine = value.get_live();
        assert!(value.compare_and_set(&nine, Arc::clone(&first)));
        assert!(!value.is_dirty());
        assert!(value.compare_and_set(&first, Arc::clone(&nine)));

        assert!(!value.compare_and_set(&first, Arc::new(10)));
        assert_eq!(*value.get_live(), 9);
    }

    #[test]
    fn test_snapshot_retains_replaced_value() {
        let registry = CommitRegistry::new();
        let first = Arc::new(vec![1, 2, 3]);
        let value = SnapshotableArc::new(&registry, Arc::clone(&first));

        value.set(Arc::new(vec![4]));
        // snapshot and our handle
        assert_eq!(Arc::strong_count(&first), 2);

        registry.advance_all();
        assert_eq!(Arc::strong_count(&first), 1);
        assert_eq!(*value.get(), vec![4]);
    }

    #[test]
    fn test_dirty_tracking() {
        let registry = CommitRegistry::new();
        let value = SnapshotableArc::from_pointee(&registry, 1_i32);
        assert!(!value.is_dirty());

        value.set(Arc::new(1));
        // Same contents, new allocation
        assert!(value.is_dirty());

        registry.advance_all();
        assert!(!value.is_dirty());
    }

    #[test]
    fn test_update() {
        let registry = CommitRegistry::new();
        let value = SnapshotableArc::from_pointee(&registry, 5_u64);

        let previous = value.update(|v| v + 1);
        assert_eq!(*previous, 5);
        assert_eq!(*value.get_live(), 6);
        assert_eq!(*value.get(), 5);
    }
}
