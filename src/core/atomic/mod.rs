/*!
 * Atomic Counter Facility
 *
 * Indivisible increment / decrement / add / compare-and-swap / max on signed
 * word-sized counters. This is the base primitive the allocator accounts with
 * and the thread registry numbers threads with.
 *
 * # Backends
 *
 * The storage cell is selected at build time:
 * - default: hardware atomics
 * - `emulated-atomics` feature: a plain word guarded by a process-wide
 *   fallback lock that no other subsystem shares
 *
 * Both cells are always compiled so either can be named explicitly
 * (`Counter<LockedCell<isize>>`), which is how the tests cover both paths.
 *
 * # Ordering
 *
 * All operations on one counter are sequentially consistent with respect to
 * that counter only. Nothing is implied between different counters.
 */

mod cell;

pub use cell::{CounterCell, LockedCell, Word};

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicIsize};

/// Cell backing [`Counter`] when no backend is named
#[cfg(not(feature = "emulated-atomics"))]
pub type DefaultCell = AtomicIsize;
#[cfg(feature = "emulated-atomics")]
pub type DefaultCell = LockedCell<isize>;

/// Cell backing [`WideCounter`] when no backend is named
#[cfg(not(feature = "emulated-atomics"))]
pub type DefaultWideCell = AtomicI64;
#[cfg(feature = "emulated-atomics")]
pub type DefaultWideCell = LockedCell<i64>;

/// Signed, pointer-sized counter mutated only through indivisible operations
///
/// Every operation returns the value *after* it completed, except
/// [`compare_and_swap`](Self::compare_and_swap) which returns the value seen
/// before the attempt and [`max`](Self::max) which returns nothing.
#[repr(C, align(64))] // Cache-line aligned to prevent false sharing
pub struct Counter<C: CounterCell<isize> = DefaultCell> {
    cell: C,
}

impl<C: CounterCell<isize>> Counter<C> {
    /// Create a counter holding `initial`
    #[inline]
    pub fn new(initial: isize) -> Self {
        Self {
            cell: C::with_value(initial),
        }
    }

    /// Add one, returning the new value
    #[inline(always)]
    pub fn increment(&self) -> isize {
        self.cell.add_fetch(1)
    }

    /// Subtract one, returning the new value
    #[inline(always)]
    pub fn decrement(&self) -> isize {
        self.cell.add_fetch(-1)
    }

    /// Add `value` (may be negative), returning the new value
    #[inline(always)]
    pub fn add(&self, value: isize) -> isize {
        self.cell.add_fetch(value)
    }

    /// Replace the value with `new_value` iff it currently equals `expected`
    ///
    /// Returns the value observed before the attempt; the swap happened iff
    /// the return equals `expected`.
    #[inline(always)]
    pub fn compare_and_swap(&self, expected: isize, new_value: isize) -> isize {
        self.cell.compare_and_swap(expected, new_value)
    }

    /// Raise the counter to `value` if `value` exceeds the current contents
    ///
    /// Retries under contention; never lowers the counter.
    #[inline]
    pub fn max(&self, value: isize) {
        self.cell.raise_to(value)
    }

    /// Current value
    #[inline(always)]
    pub fn load(&self) -> isize {
        self.cell.load()
    }

    /// Name of the backend compiled in for this counter
    #[inline]
    pub fn backend(&self) -> &'static str {
        C::BACKEND
    }
}

impl<C: CounterCell<isize>> Default for Counter<C> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<C: CounterCell<isize>> fmt::Debug for Counter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter")
            .field("value", &self.load())
            .field("backend", &C::BACKEND)
            .finish()
    }
}

/// 64-bit counter for running totals that may outgrow a 32-bit word
pub struct WideCounter<C: CounterCell<i64> = DefaultWideCell> {
    cell: C,
}

impl<C: CounterCell<i64>> WideCounter<C> {
    #[inline]
    pub fn new(initial: i64) -> Self {
        Self {
            cell: C::with_value(initial),
        }
    }

    /// Add `value`, returning the new total
    #[inline(always)]
    pub fn add(&self, value: i64) -> i64 {
        self.cell.add_fetch(value)
    }

    #[inline(always)]
    pub fn load(&self) -> i64 {
        self.cell.load()
    }
}

impl<C: CounterCell<i64>> Default for WideCounter<C> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<C: CounterCell<i64>> fmt::Debug for WideCounter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WideCounter")
            .field("value", &self.load())
            .field("backend", &C::BACKEND)
            .finish()
    }
}
