//! # Commit Registry
//!
//! Owns the set of values that advance together and drives that advance on
//! command of an external driver (tick loop, scheduler).
//!
//! ## Architecture
//!
//! ```text
//!   writer threads                 driver (once per cycle)
//!        │ set / compare_and_set            │
//!        ▼                                  ▼
//!   ┌──────────┐  ┌──────────┐     ┌──────────────────┐
//!   │ value A  │  │ value B  │ ◄── │  CommitRegistry  │
//!   │ live|snap│  │ live|snap│     │  advance_all()   │
//!   └──────────┘  └──────────┘     └──────────────────┘
//!        ▲
//!        │ get (stable between cycles)
//!   reader threads
//! ```
//!
//! ## Thread Safety
//!
//! - Registration, unregistration and `advance_all` share one mutex, so a
//!   registration never lands in the middle of a cycle; it waits for the
//!   cycle to finish.
//! - The per-value slots are never guarded by that mutex. Writers and
//!   readers stay lock-free.
//! - The registry holds weak references. A value whose holders all dropped
//!   it is pruned on the next cycle.

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::{RegistryConfig, MAX_INITIAL_CAPACITY};

/// Anything the registry can commit.
///
/// [`Snapshotable`](super::Snapshotable) and
/// [`SnapshotableArc`](super::SnapshotableArc) implement this. Aggregates that
/// own several standalone values can implement it too, forwarding the
/// [`CommitCycle`] they receive to each child.
pub trait CommitTarget: Send + Sync {
    /// Copies the live value into the snapshot.
    ///
    /// Only reachable through a [`CommitCycle`], which only the registry
    /// creates, so consumers cannot commit a value on their own.
    fn copy_snapshot(&self, cycle: &CommitCycle);

    /// Whether the live value currently differs from the snapshot.
    fn is_dirty(&self) -> bool;
}

/// Proof that a commit cycle is in progress.
///
/// Handed to every [`CommitTarget::copy_snapshot`] call by
/// [`CommitRegistry::advance_all`].
#[derive(Debug)]
pub struct CommitCycle {
    number: u64,
}

impl CommitCycle {
    /// The 1-based number of the cycle being committed.
    #[inline]
    #[must_use]
    pub const fn number(&self) -> u64 {
        self.number
    }
}

/// Outcome of one [`CommitRegistry::advance_all`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleStats {
    /// Cycle number (1 for the first advance).
    pub cycle: u64,
    /// Targets whose snapshot was advanced.
    pub committed: usize,
    /// Registrations dropped because their value no longer exists.
    pub pruned: usize,
    /// Wall time spent inside the cycle.
    pub elapsed: Duration,
}

thread_local! {
    /// Registries whose cycle is running on this thread, innermost last.
    static ACTIVE_CYCLES: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a registry as running a commit cycle on this thread until dropped.
struct CommitScope {
    registry: usize,
}

impl CommitScope {
    fn enter(registry: &CommitRegistry) -> Self {
        let registry = address_of(registry as *const CommitRegistry);
        ACTIVE_CYCLES.with(|active| active.borrow_mut().push(registry));
        Self { registry }
    }

    fn assert_outside(registry: &CommitRegistry, operation: &str) {
        debug_assert!(
            !ACTIVE_CYCLES.with(|active| active.borrow().contains(&address_of(registry as *const CommitRegistry))),
            "Cannot {operation} from inside a commit cycle of the same registry!"
        );
    }
}

impl Drop for CommitScope {
    fn drop(&mut self) {
        ACTIVE_CYCLES.with(|active| {
            let mut active = active.borrow_mut();
            if let Some(index) = active.iter().rposition(|&registry| registry == self.registry) {
                active.remove(index);
            }
        });
    }
}

#[derive(Debug)]
struct Targets {
    /// Registration order.
    order: Vec<Weak<dyn CommitTarget>>,
    /// Addresses of registered targets, for duplicate checks.
    addresses: HashSet<usize>,
}

/// Address of the value behind an `Arc`, used as its registry identity.
///
/// A registered target's allocation stays alive while its `Weak` is held
/// here, so the address cannot be reused by another value.
fn address_of<T: ?Sized>(target: *const T) -> usize {
    target.cast::<()>() as usize
}

/// Ordered set of values advanced together, once per cycle.
///
/// Created once per logical domain (simulation, session) and passed
/// explicitly to every value's constructor.
///
/// ## Usage
///
/// ```rust,ignore
/// let registry = CommitRegistry::new();
/// let alive = Snapshotable::new(&registry, false);
///
/// // Writer threads
/// alive.set(true);
/// assert!(!alive.get());
///
/// // Driver, once per tick
/// registry.advance_all();
/// assert!(alive.get());
/// ```
#[derive(Debug)]
pub struct CommitRegistry {
    config: RegistryConfig,
    targets: Mutex<Targets>,
    /// Completed cycles.
    cycle_count: AtomicU64,
}

impl Default for CommitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommitRegistry {
    /// Creates an empty registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Creates an empty registry from `config`.
    ///
    /// `initial_capacity` is clamped to [`MAX_INITIAL_CAPACITY`] for configs
    /// that skipped [`RegistryConfig::validate`].
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        let capacity = config.initial_capacity.min(MAX_INITIAL_CAPACITY);
        let targets = Targets {
            order: Vec::with_capacity(capacity),
            addresses: HashSet::with_capacity(capacity),
        };

        Self {
            config,
            targets: Mutex::new(targets),
            cycle_count: AtomicU64::new(0),
        }
    }

    /// Returns the configuration this registry was built with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Returns the number of completed cycles.
    #[inline]
    #[must_use]
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count.load(Ordering::Acquire)
    }

    /// Returns the number of registered targets that still exist.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets
            .lock()
            .order
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Returns whether no registered target still exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns how many registered targets are dirty right now.
    ///
    /// Races with writers; diagnostic only.
    #[must_use]
    pub fn dirty_count(&self) -> usize {
        self.targets
            .lock()
            .order
            .iter()
            .filter(|weak| weak.upgrade().is_some_and(|target| target.is_dirty()))
            .count()
    }

    /// Appends `target` to the commit order.
    ///
    /// Registering a target that is already registered is a no-op, so no
    /// target is ever committed twice in one cycle. Blocks while a cycle is
    /// in progress.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if called from inside a commit cycle.
    pub fn register<T: CommitTarget + 'static>(&self, target: &Arc<T>) {
        CommitScope::assert_outside(self, "register");

        let address = address_of(Arc::as_ptr(target));
        let target: Arc<dyn CommitTarget> = Arc::<T>::clone(target);

        let mut targets = self.targets.lock();
        if !targets.addresses.insert(address) {
            tracing::debug!(registry = %self.config.name, "commit target already registered");
            return;
        }
        targets.order.push(Arc::downgrade(&target));

        tracing::debug!(
            registry = %self.config.name,
            targets = targets.order.len(),
            "registered commit target"
        );
    }

    /// Removes `target` from the commit order.
    ///
    /// Returns `false` if it was not registered. Blocks while a cycle is in
    /// progress, so a target never leaves mid-cycle.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if called from inside a commit cycle.
    pub fn unregister<T: CommitTarget + 'static>(&self, target: &Arc<T>) -> bool {
        CommitScope::assert_outside(self, "unregister");

        let address = address_of(Arc::as_ptr(target));

        let mut targets = self.targets.lock();
        if !targets.addresses.remove(&address) {
            return false;
        }
        if let Some(index) = targets
            .order
            .iter()
            .position(|weak| address_of(weak.as_ptr()) == address)
        {
            targets.order.remove(index);
        }

        tracing::debug!(
            registry = %self.config.name,
            targets = targets.order.len(),
            "unregistered commit target"
        );
        true
    }

    /// Advances every registered target: copies live into snapshot.
    ///
    /// Targets are committed in registration order, each exactly once.
    /// Targets whose value was dropped are pruned. When this returns, every
    /// stable read observes the new cycle.
    ///
    /// Must not be called concurrently with itself from the driver's point of
    /// view; concurrent calls are serialized by the registry mutex.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if called from inside a commit cycle.
    pub fn advance_all(&self) -> CycleStats {
        CommitScope::assert_outside(self, "advance");

        let mut targets = self.targets.lock();
        // waiting on the lock is not part of the cycle
        let started = Instant::now();
        let _scope = CommitScope::enter(self);

        let cycle = CommitCycle {
            number: self.cycle_count.load(Ordering::Acquire) + 1,
        };
        let mut committed = 0;
        let mut pruned = 0;

        let Targets { order, addresses } = &mut *targets;
        // retain visits every element once, in order
        order.retain(|weak| {
            if let Some(target) = weak.upgrade() {
                target.copy_snapshot(&cycle);
                committed += 1;
                true
            } else {
                addresses.remove(&address_of(weak.as_ptr()));
                pruned += 1;
                false
            }
        });

        self.cycle_count.store(cycle.number, Ordering::Release);
        drop(targets);

        let stats = CycleStats {
            cycle: cycle.number,
            committed,
            pruned,
            elapsed: started.elapsed(),
        };

        tracing::trace!(
            registry = %self.config.name,
            cycle = stats.cycle,
            committed = stats.committed,
            pruned = stats.pruned,
            "commit cycle complete"
        );
        if let Some(threshold) = self.config.slow_cycle_threshold() {
            if stats.elapsed > threshold {
                tracing::warn!(
                    registry = %self.config.name,
                    cycle = stats.cycle,
                    elapsed_us = u64::try_from(stats.elapsed.as_micros()).unwrap_or(u64::MAX),
                    "slow commit cycle"
                );
            }
        }

        stats
    }
}
