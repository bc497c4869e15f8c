//! # Snapshotable Scalars
//!
//! One value, two slots:
//!
//! ```text
//!   set / compare_and_set ──► [ live ] ──copy_snapshot──► [ snapshot ] ──► get
//!   (any thread, any time)              (registry, once      (stable between
//!                                        per cycle)            cycles)
//! ```
//!
//! ## Memory Ordering
//!
//! Writers store the live slot with `Release`; the commit loads it with
//! `Acquire` and publishes the snapshot with `Release`; `get` loads the
//! snapshot with `Acquire`. A write that completed before a commit is
//! therefore visible to every stable read after that commit returns.

use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::registry::{CommitCycle, CommitRegistry, CommitTarget};
use super::value::AtomicValue;

/// A scalar with a racy live slot and a stable snapshot slot.
///
/// Covers `bool`, integers and floats through [`AtomicValue`]. Every
/// operation is lock-free and returns immediately.
///
/// ## Usage
///
/// ```rust,ignore
/// let registry = CommitRegistry::new();
/// let health = Snapshotable::new(&registry, 100_u32);
///
/// // Any thread
/// health.set(80);
/// assert_eq!(health.get(), 100); // still last cycle's value
///
/// registry.advance_all();
/// assert_eq!(health.get(), 80);
/// ```
pub struct Snapshotable<T: AtomicValue> {
    /// Written by any thread at any time.
    live: T::Cell,
    /// Written only by `copy_snapshot`.
    snapshot: T::Cell,
}

impl<T: AtomicValue> Snapshotable<T> {
    /// Creates a value and registers it with `registry`.
    ///
    /// Both slots start at `initial`. The registry keeps a weak reference;
    /// the returned `Arc` owns the value.
    #[must_use]
    pub fn new(registry: &CommitRegistry, initial: T) -> Arc<Self> {
        let value = Arc::new(Self::standalone(initial));
        registry.register(&value);
        value
    }

    /// Creates a value that belongs to no registry.
    ///
    /// Useful inside an aggregate [`CommitTarget`] that forwards its
    /// [`CommitCycle`] to each of its fields.
    #[must_use]
    pub fn standalone(initial: T) -> Self {
        Self {
            live: T::new_cell(initial),
            snapshot: T::new_cell(initial),
        }
    }

    /// **Delayed write.** Stores `value` into the live slot.
    ///
    /// Not visible to [`get`](Self::get) until the next commit. Concurrent
    /// setters race: the last store to land before the commit wins, with no
    /// ordering among writers.
    #[inline]
    pub fn set(&self, value: T) {
        T::store(&self.live, value, Ordering::Release);
    }

    /// **Delayed write.** Replaces the live value, returning the previous one.
    #[inline]
    pub fn swap(&self, value: T) -> T {
        T::swap(&self.live, value, Ordering::AcqRel)
    }

    /// **Delayed write.** Stores `next` iff the live slot holds `expected`.
    ///
    /// Touches the live slot only. Returns `false` and leaves the live slot
    /// unchanged if it held something else; retrying is up to the caller.
    #[inline]
    pub fn compare_and_set(&self, expected: T, next: T) -> bool {
        T::compare_exchange(&self.live, expected, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// **Delayed write.** Applies `f` to the live value until the
    /// compare-and-set succeeds, returning the live value `f` replaced.
    ///
    /// `f` may run several times under contention.
    pub fn update<F>(&self, mut f: F) -> T
    where
        F: FnMut(T) -> T,
    {
        let mut current = T::load(&self.live, Ordering::Acquire);
        loop {
            let next = f(current);
            let exchanged =
                T::compare_exchange(&self.live, current, next, Ordering::AcqRel, Ordering::Acquire);
            match exchanged {
                Ok(previous) => return previous,
                Err(actual) => current = actual,
            }
        }
    }

    /// **Stable read.** Returns the value as of the last completed commit.
    ///
    /// Two calls with no commit in between return the same value.
    #[inline]
    #[must_use]
    pub fn get(&self) -> T {
        T::load(&self.snapshot, Ordering::Acquire)
    }

    /// **Live read.** Returns the current live value.
    ///
    /// Races with writers. Diagnostic only; never base consistency-sensitive
    /// logic on it.
    #[inline]
    #[must_use]
    pub fn get_live(&self) -> T {
        T::load(&self.live, Ordering::Acquire)
    }

    /// **Live read.** Whether the live value differs from the snapshot now.
    ///
    /// A heuristic: a concurrent writer can change the answer immediately.
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !T::same(self.get_live(), self.get())
    }
}

impl<T: AtomicValue> CommitTarget for Snapshotable<T> {
    #[inline]
    fn copy_snapshot(&self, _cycle: &CommitCycle) {
        let live = T::load(&self.live, Ordering::Acquire);
        T::store(&self.snapshot, live, Ordering::Release);
    }

    #[inline]
    fn is_dirty(&self) -> bool {
        Snapshotable::is_dirty(self)
    }
}

impl<T: AtomicValue + fmt::Debug> fmt::Debug for Snapshotable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshotable")
            .field("live", &self.get_live())
            .field("snapshot", &self.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_is_delayed_until_commit() {
        let registry = CommitRegistry::new();
        let flag = Snapshotable::new(&registry, false);

        flag.set(true);
        assert!(!flag.get());
        assert!(flag.get_live());

        registry.advance_all();
        assert!(flag.get());
    }

    #[test]
    fn test_last_set_wins() {
        let registry = CommitRegistry::new();
        let counter = Snapshotable::new(&registry, 0_i64);

        for value in [3, -9, 42, 7] {
            counter.set(value);
        }
        registry.advance_all();

        assert_eq!(counter.get(), 7);
    }

    #[test]
    fn test_compare_and_set() {
        let registry = CommitRegistry::new();
        let flag = Snapshotable::new(&registry, true);

        assert!(flag.compare_and_set(true, false));
        assert!(!flag.get_live());
        assert!(flag.is_dirty());

        assert!(!flag.compare_and_set(true, false));
        assert!(!flag.get_live());

        // Snapshot untouched by CAS
        assert!(flag.get());

        // Swapping back to the committed value clears dirtiness
        assert!(flag.compare_and_set(false, true));
        assert!(!flag.is_dirty());
    }

    #[test]
    fn test_dirty_tracking() {
        let registry = CommitRegistry::new();
        let value = Snapshotable::new(&registry, 1_u16);
        assert!(!value.is_dirty());

        value.set(2);
        assert!(value.is_dirty());

        registry.advance_all();
        assert!(!value.is_dirty());

        // Writing the committed value back is not dirty
        value.set(2);
        assert!(!value.is_dirty());
    }

    #[test]
    fn test_swap_and_update() {
        let registry = CommitRegistry::new();
        let value = Snapshotable::new(&registry, 10_u32);

        assert_eq!(value.swap(20), 10);
        assert_eq!(value.update(|v| v * 2), 20);
        assert_eq!(value.get_live(), 40);
        assert_eq!(value.get(), 10);
    }

    #[test]
    fn test_float_values() {
        let registry = CommitRegistry::new();
        let speed = Snapshotable::new(&registry, 1.5_f32);

        speed.set(2.25);
        registry.advance_all();

        assert!((speed.get() - 2.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_standalone_is_not_registered() {
        let registry = CommitRegistry::new();
        let value = Snapshotable::standalone(5_u8);

        value.set(6);
        registry.advance_all();

        assert_eq!(value.get(), 5);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_debug_shows_both_slots() {
        let registry = CommitRegistry::new();
        let value = Snapshotable::new(&registry, 1_u8);
        value.set(2);

        assert_eq!(format!("{value:?}"), "Snapshotable { live: 2, snapshot: 1 }");
    }
}
