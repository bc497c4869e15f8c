//! # Tickstate Core
//!
//! Values that many threads write freely but everyone reads as one stable
//! version, advanced only at explicit commit points.
//!
//! - [`Snapshotable<T>`]: scalars (`bool`, integers, floats)
//! - [`SnapshotableArc<T>`]: shared values behind an `Arc`
//! - [`CommitRegistry`]: advances every registered value once per cycle
//!
//! ## Rules
//!
//! 1. **Writers never block** - every value operation is a single atomic step
//! 2. **Readers agree** - `get` returns the same value until the next commit
//! 3. **One committer** - only the registry advances snapshots, once per cycle
//!
//! Deciding *when* a cycle ends belongs to the caller's tick loop.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tickstate_core::{CommitRegistry, Snapshotable};
//!
//! let registry = CommitRegistry::new();
//! let score = Snapshotable::new(&registry, 0_u64);
//!
//! loop {
//!     // Workers: score.update(|s| s + 10);
//!     // Readers: score.get() is stable for the whole tick
//!     registry.advance_all();
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod sync;

pub use config::RegistryConfig;
pub use error::{TickstateError, TickstateResult};
pub use sync::{
    AtomicValue, CommitCycle, CommitRegistry, CommitTarget, CycleStats, Snapshotable,
    SnapshotableArc,
};
