//! # Live/Snapshot Synchronization
//!
//! ## The Problem
//!
//! ```text
//! Writer threads:  update a value whenever they like
//! Reader threads:  need ONE consistent version for the whole tick
//!
//! Shared plain value:  readers see it change mid-tick
//! With Mutex:          writers stall behind readers
//! ```
//!
//! ## The Solution: Live + Snapshot
//!
//! ```text
//! Cycle N:
//!   Writers store into LIVE (atomic, last writer wins)
//!   Readers load SNAPSHOT (cycle N-1's agreed value)
//!
//! End of cycle N:
//!   CommitRegistry::advance_all() copies LIVE -> SNAPSHOT for every value
//! ```
//!
//! No locks on the value path. One agreed version per cycle.

mod registry;
mod shared;
mod snapshotable;
mod value;

pub use registry::{CommitCycle, CommitRegistry, CommitTarget, CycleStats};
pub use shared::SnapshotableArc;
pub use snapshotable::Snapshotable;
pub use value::AtomicValue;
