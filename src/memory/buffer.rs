/*!
 * Tracked Buffer
 *
 * Safe owning byte buffer on top of the raw allocator: zero-initialized,
 * resizable, and freed (and credited back) on drop.
 */

use super::allocator::Allocator;
use super::stats::StatsHandle;
use super::types::{MemoryError, MemoryResult};
use std::alloc::{GlobalAlloc, System};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::slice;

pub struct TrackedBuffer<'a, A: GlobalAlloc = System> {
    ptr: NonNull<u8>,
    len: usize,
    allocator: &'a Allocator<A>,
    /// Record the block is charged to
    stats: StatsHandle,
}

// SAFETY: the buffer uniquely owns its block; the allocator is Sync
unsafe impl<A: GlobalAlloc + Sync> Send for TrackedBuffer<'_, A> {}
unsafe impl<A: GlobalAlloc + Sync> Sync for TrackedBuffer<'_, A> {}

impl<'a, A: GlobalAlloc> TrackedBuffer<'a, A> {
    /// `len` zeroed bytes charged to the allocator's default record
    #[track_caller]
    pub fn new(allocator: &'a Allocator<A>, len: usize) -> MemoryResult<Self> {
        Self::new_in(allocator, len, allocator.stats())
    }

    /// `len` zeroed bytes charged to `stats`
    #[track_caller]
    pub fn new_in(allocator: &'a Allocator<A>, len: usize, stats: &StatsHandle) -> MemoryResult<Self> {
        let ptr = allocator
            .zeroed_allocate_in(len, 1, stats)
            .ok_or(MemoryError::AllocationFailed { requested: len })?;
        Ok(Self {
            ptr,
            len,
            allocator,
            stats: stats.clone(),
        })
    }

    /// Zeroed storage for `count` elements of `size` bytes
    #[track_caller]
    pub fn zeroed(allocator: &'a Allocator<A>, count: usize, size: usize) -> MemoryResult<Self> {
        let len = count
            .checked_mul(size)
            .ok_or(MemoryError::SizeOverflow { count, size })?;
        Self::new(allocator, len)
    }

    /// Change the length; new bytes are zeroed
    ///
    /// On failure the buffer is unchanged. Resizing to zero keeps a
    /// zero-length block rather than freeing.
    #[track_caller]
    pub fn resize(&mut self, new_len: usize) -> MemoryResult<()> {
        if new_len == self.len {
            return Ok(());
        }
        if new_len == 0 {
            let empty = self
                .allocator
                .allocate_in(0, &self.stats)
                .ok_or(MemoryError::AllocationFailed { requested: 0 })?;
            // SAFETY: self.ptr is our live block
            unsafe { self.allocator.free(Some(self.ptr)) };
            self.ptr = empty;
            self.len = 0;
            return Ok(());
        }

        // SAFETY: self.ptr is our live block and new_len is non-zero
        let ptr = unsafe { self.allocator.reallocate(Some(self.ptr), new_len) }
            .ok_or(MemoryError::AllocationFailed { requested: new_len })?;
        if new_len > self.len {
            // SAFETY: the block spans new_len bytes
            unsafe { ptr.as_ptr().add(self.len).write_bytes(0, new_len - self.len) };
        }
        self.ptr = ptr;
        self.len = new_len;
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn stats(&self) -> &StatsHandle {
        &self.stats
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }
}

impl<A: GlobalAlloc> Deref for TrackedBuffer<'_, A> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: ptr spans len initialized bytes owned by self
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<A: GlobalAlloc> DerefMut for TrackedBuffer<'_, A> {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: as for deref, and &mut self is unique
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<A: GlobalAlloc> Drop for TrackedBuffer<'_, A> {
    fn drop(&mut self) {
        // SAFETY: we own the block and never hand it out
        unsafe { self.allocator.free(Some(self.ptr)) };
    }
}

impl<A: GlobalAlloc> fmt::Debug for TrackedBuffer<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}
