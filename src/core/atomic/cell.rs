/*!
 * Counter Cells
 *
 * Storage backends for the atomic counter facility:
 * - Hardware atomics (`AtomicIsize` / `AtomicI64`) using sequentially
 *   consistent read-modify-write instructions
 * - `LockedCell`, a plain word guarded by the process-wide fallback lock, for
 *   targets without usable atomic instructions
 *
 * Both expose the same contract: every observed value was produced by one
 * complete operation, and all operations on one cell form a single total order.
 */

use parking_lot::{const_mutex, Mutex};
use std::cell::UnsafeCell;
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicIsize, Ordering};

/// Fallback lock for `LockedCell`
///
/// Owned by the counter facility alone. Condition variables and the allocator
/// never take it, and nothing that can block runs while it is held.
static FALLBACK_LOCK: Mutex<()> = const_mutex(());

/// Signed machine word a counter cell can hold
pub trait Word: Copy + Ord + fmt::Debug + Send + Sync + 'static {
    fn wrapping_add(self, rhs: Self) -> Self;
}

impl Word for isize {
    #[inline(always)]
    fn wrapping_add(self, rhs: Self) -> Self {
        isize::wrapping_add(self, rhs)
    }
}

impl Word for i64 {
    #[inline(always)]
    fn wrapping_add(self, rhs: Self) -> Self {
        i64::wrapping_add(self, rhs)
    }
}

/// Indivisible storage for a counter word
///
/// Implementations must never block beyond an O(1) critical section.
pub trait CounterCell<W: Word>: Send + Sync {
    /// Backend name for diagnostics
    const BACKEND: &'static str;

    fn with_value(value: W) -> Self;

    /// Read the current value (never torn)
    fn load(&self) -> W;

    /// Add `delta` and return the resulting value
    fn add_fetch(&self, delta: W) -> W;

    /// Store `new` iff the current value equals `expected`; return the prior value
    fn compare_and_swap(&self, expected: W, new: W) -> W;

    /// Raise the value to `value` if it is larger
    fn raise_to(&self, value: W);
}

impl CounterCell<isize> for AtomicIsize {
    const BACKEND: &'static str = "hardware";

    #[inline]
    fn with_value(value: isize) -> Self {
        AtomicIsize::new(value)
    }

    #[inline(always)]
    fn load(&self) -> isize {
        AtomicIsize::load(self, Ordering::SeqCst)
    }

    #[inline(always)]
    fn add_fetch(&self, delta: isize) -> isize {
        self.fetch_add(delta, Ordering::SeqCst).wrapping_add(delta)
    }

    #[inline(always)]
    fn compare_and_swap(&self, expected: isize, new: isize) -> isize {
        match self.compare_exchange(expected, new, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(prior) | Err(prior) => prior,
        }
    }

    #[inline]
    fn raise_to(&self, value: isize) {
        let mut current = CounterCell::load(self);
        while current < value {
            current = CounterCell::compare_and_swap(self, current, value);
        }
    }
}

impl CounterCell<i64> for AtomicI64 {
    const BACKEND: &'static str = "hardware";

    #[inline]
    fn with_value(value: i64) -> Self {
        AtomicI64::new(value)
    }

    #[inline(always)]
    fn load(&self) -> i64 {
        AtomicI64::load(self, Ordering::SeqCst)
    }

    #[inline(always)]
    fn add_fetch(&self, delta: i64) -> i64 {
        self.fetch_add(delta, Ordering::SeqCst).wrapping_add(delta)
    }

    #[inline(always)]
    fn compare_and_swap(&self, expected: i64, new: i64) -> i64 {
        match self.compare_exchange(expected, new, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(prior) | Err(prior) => prior,
        }
    }

    #[inline]
    fn raise_to(&self, value: i64) {
        let mut current = CounterCell::load(self);
        while current < value {
            current = CounterCell::compare_and_swap(self, current, value);
        }
    }
}

/// Plain word guarded by the fallback lock
pub struct LockedCell<W: Word> {
    value: UnsafeCell<W>,
}

// SAFETY: every access to `value` happens with FALLBACK_LOCK held.
unsafe impl<W: Word> Sync for LockedCell<W> {}

impl<W: Word> LockedCell<W> {
    #[inline]
    fn with_locked<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        let _guard = FALLBACK_LOCK.lock();
        // SAFETY: the fallback lock serializes all access to every LockedCell.
        f(unsafe { &mut *self.value.get() })
    }
}

impl<W: Word> CounterCell<W> for LockedCell<W> {
    const BACKEND: &'static str = "fallback-lock";

    fn with_value(value: W) -> Self {
        Self {
            value: UnsafeCell::new(value),
        }
    }

    fn load(&self) -> W {
        self.with_locked(|v| *v)
    }

    fn add_fetch(&self, delta: W) -> W {
        self.with_locked(|v| {
            *v = v.wrapping_add(delta);
            *v
        })
    }

    fn compare_and_swap(&self, expected: W, new: W) -> W {
        self.with_locked(|v| {
            let prior = *v;
            if prior == expected {
                *v = new;
            }
            prior
        })
    }

    fn raise_to(&self, value: W) {
        self.with_locked(|v| {
            if *v < value {
                *v = value;
            }
        })
    }
}

impl<W: Word> fmt::Debug for LockedCell<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LockedCell").field(&self.load()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise<C: CounterCell<isize>>() {
        let cell = C::with_value(5);
        assert_eq!(cell.add_fetch(3), 8);
        assert_eq!(cell.add_fetch(-10), -2);
        assert_eq!(cell.compare_and_swap(-2, 7), -2);
        assert_eq!(cell.load(), 7);
        assert_eq!(cell.compare_and_swap(0, 100), 7);
        assert_eq!(cell.load(), 7);
        cell.raise_to(3);
        assert_eq!(cell.load(), 7);
        cell.raise_to(42);
        assert_eq!(cell.load(), 42);
    }

    #[test]
    fn test_hardware_cell() {
        exercise::<AtomicIsize>();
    }

    #[test]
    fn test_locked_cell() {
        exercise::<LockedCell<isize>>();
    }

    #[test]
    fn test_add_wraps_like_hardware() {
        let hw = AtomicIsize::with_value(isize::MAX);
        let locked = LockedCell::with_value(isize::MAX);
        assert_eq!(hw.add_fetch(1), locked.add_fetch(1));
    }

    #[test]
    fn test_wide_cells_agree() {
        let hw = AtomicI64::with_value(1 << 40);
        let locked = LockedCell::<i64>::with_value(1 << 40);
        assert_eq!(hw.add_fetch(1 << 33), locked.add_fetch(1 << 33));
        assert_eq!(CounterCell::load(&hw), locked.load());
    }
}
