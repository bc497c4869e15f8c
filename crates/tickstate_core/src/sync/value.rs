//! # Atomic Value Storage
//!
//! Maps plain scalar types onto the lock-free cell that stores them, so a
//! single generic [`Snapshotable<T>`](super::Snapshotable) covers booleans,
//! integers and floats.

#[cfg(target_has_atomic = "64")]
use std::sync::atomic::{AtomicI64, AtomicU64};
use std::sync::atomic::{
    AtomicBool, AtomicI16, AtomicI32, AtomicI8, AtomicIsize, AtomicU16, AtomicU32, AtomicU8,
    AtomicUsize, Ordering,
};

/// A scalar that can live in a lock-free atomic slot.
///
/// Implemented for `bool`, every fixed-width integer, `usize`/`isize`,
/// `f32` and `f64`.
///
/// Floats are stored as their bit pattern. Equality used by compare-and-set
/// and dirty checks is therefore bitwise: `0.0` and `-0.0` differ, and a `NaN`
/// equals a `NaN` with the same bits.
pub trait AtomicValue: Copy + Send + Sync + 'static {
    /// Atomic cell holding one `Self`.
    type Cell: Send + Sync;

    /// Creates a cell holding `value`.
    fn new_cell(value: Self) -> Self::Cell;

    /// Atomically loads the cell.
    fn load(cell: &Self::Cell, order: Ordering) -> Self;

    /// Atomically stores `value` into the cell.
    fn store(cell: &Self::Cell, value: Self, order: Ordering);

    /// Atomically replaces the cell's value, returning the previous one.
    fn swap(cell: &Self::Cell, value: Self, order: Ordering) -> Self;

    /// Stores `new` iff the cell currently holds `current`.
    ///
    /// Returns `Ok(previous)` on success and `Err(actual)` on failure.
    ///
    /// # Errors
    ///
    /// Returns the value actually held when it differs from `current`.
    fn compare_exchange(
        cell: &Self::Cell,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self>;

    /// Equality as the atomic cell sees it.
    fn same(a: Self, b: Self) -> bool;
}

macro_rules! impl_atomic_value {
    ($($(#[$attr:meta])* $ty:ty => $atomic:ty),* $(,)?) => {
        $(
            $(#[$attr])*
            impl AtomicValue for $ty {
                type Cell = $atomic;

                #[inline]
                fn new_cell(value: Self) -> Self::Cell {
                    <$atomic>::new(value)
                }

                #[inline]
                fn load(cell: &Self::Cell, order: Ordering) -> Self {
                    cell.load(order)
                }

                #[inline]
                fn store(cell: &Self::Cell, value: Self, order: Ordering) {
                    cell.store(value, order);
                }

                #[inline]
                fn swap(cell: &Self::Cell, value: Self, order: Ordering) -> Self {
                    cell.swap(value, order)
                }

                #[inline]
                fn compare_exchange(
                    cell: &Self::Cell,
                    current: Self,
                    new: Self,
                    success: Ordering,
                    failure: Ordering,
                ) -> Result<Self, Self> {
                    cell.compare_exchange(current, new, success, failure)
                }

                #[inline]
                fn same(a: Self, b: Self) -> bool {
                    a == b
                }
            }
        )*
    };
}

macro_rules! impl_atomic_float {
    ($($(#[$attr:meta])* $ty:ty => $atomic:ty),* $(,)?) => {
        $(
            $(#[$attr])*
            impl AtomicValue for $ty {
                type Cell = $atomic;

                #[inline]
                fn new_cell(value: Self) -> Self::Cell {
                    <$atomic>::new(value.to_bits())
                }

                #[inline]
                fn load(cell: &Self::Cell, order: Ordering) -> Self {
                    <$ty>::from_bits(cell.load(order))
                }

                #[inline]
                fn store(cell: &Self::Cell, value: Self, order: Ordering) {
                    cell.store(value.to_bits(), order);
                }

                #[inline]
                fn swap(cell: &Self::Cell, value: Self, order: Ordering) -> Self {
                    <$ty>::from_bits(cell.swap(value.to_bits(), order))
                }

                #[inline]
                fn compare_exchange(
                    cell: &Self::Cell,
                    current: Self,
                    new: Self,
                    success: Ordering,
                    failure: Ordering,
                ) -> Result<Self, Self> {
                    cell.compare_exchange(current.to_bits(), new.to_bits(), success, failure)
                        .map(<$ty>::from_bits)
                        .map_err(<$ty>::from_bits)
                }

                #[inline]
                fn same(a: Self, b: Self) -> bool {
                    a.to_bits() == b.to_bits()
                }
            }
        )*
    };
}

impl_atomic_value! {
    bool => AtomicBool,
    u8 => AtomicU8,
    u16 => AtomicU16,
    u32 => AtomicU32,
    #[cfg(target_has_atomic = "64")]
    u64 => AtomicU64,
    usize => AtomicUsize,
    i8 => AtomicI8,
    i16 => AtomicI16,
    i32 => AtomicI32,
    #[cfg(target_has_atomic = "64")]
    i64 => AtomicI64,
    isize => AtomicIsize,
}

impl_atomic_float! {
    f32 => AtomicU32,
    #[cfg(target_has_atomic = "64")]
    f64 => AtomicU64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_cell_roundtrip() {
        let cell = i32::new_cell(-7);
        assert_eq!(i32::load(&cell, Ordering::Acquire), -7);
        assert_eq!(i32::swap(&cell, 11, Ordering::AcqRel), -7);
        assert_eq!(i32::load(&cell, Ordering::Acquire), 11);
    }

    #[test]
    fn test_float_compare_exchange_is_bitwise() {
        let cell = f64::new_cell(0.0);

        // -0.0 == 0.0 numerically, but not bitwise
        let result = f64::compare_exchange(&cell, -0.0, 1.0, Ordering::AcqRel, Ordering::Acquire);
        assert!(result.is_err());

        let result = f64::compare_exchange(&cell, 0.0, 1.5, Ordering::AcqRel, Ordering::Acquire);
        assert_eq!(result, Ok(0.0));
        assert!(f64::same(f64::load(&cell, Ordering::Acquire), 1.5));
    }

    #[test]
    fn test_nan_is_same_as_itself() {
        assert!(f32::same(f32::NAN, f32::NAN));
        assert!(!f32::same(0.0, -0.0));
    }
}
