/*!
 * Block Header
 *
 * Every instrumented block is preceded by a header recording its requested
 * size and the statistics record it was charged to:
 *
 * ```text
 * base                      base + HEADER_SIZE
 * | size | stats | padding | user bytes ...
 * ```
 *
 * `HEADER_SIZE` is a multiple of `BLOCK_ALIGN`, so the user pointer keeps
 * the alignment of the underlying block.
 */

use super::stats::{MemoryStats, StatsHandle};
use crate::core::limits::{BLOCK_ALIGN, HEADER_SIZE};
use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::Arc;

#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct BlockHeader {
    pub size: usize,
    /// Strong reference produced by `Arc::into_raw`
    pub stats: *const MemoryStats,
}

const _: () = assert!(std::mem::size_of::<BlockHeader>() <= HEADER_SIZE);
const _: () = assert!(HEADER_SIZE % BLOCK_ALIGN == 0);

impl BlockHeader {
    /// Layout of the underlying block for `size` user bytes
    #[inline]
    pub fn layout_for(size: usize) -> Option<Layout> {
        let total = size.checked_add(HEADER_SIZE)?;
        Layout::from_size_align(total, BLOCK_ALIGN).ok()
    }

    /// Write a header at `base`, taking a strong reference to `stats`
    ///
    /// # Safety
    ///
    /// `base` must point to a block of at least `layout_for(size)` bytes.
    #[inline]
    pub unsafe fn write(base: NonNull<u8>, size: usize, stats: &StatsHandle) -> NonNull<u8> {
        let header = BlockHeader {
            size,
            stats: Arc::into_raw(stats.clone()),
        };
        Self::store(base, header)
    }

    /// Rewrite the header of a moved block, keeping its stats reference
    ///
    /// # Safety
    ///
    /// As for [`write`](Self::write); `stats` must come from a header.
    #[inline]
    pub unsafe fn store(base: NonNull<u8>, header: BlockHeader) -> NonNull<u8> {
        base.as_ptr().cast::<BlockHeader>().write(header);
        NonNull::new_unchecked(base.as_ptr().add(HEADER_SIZE))
    }

    /// Locate the header of a user pointer
    ///
    /// # Safety
    ///
    /// `user` must have been returned by the instrumented allocator and not
    /// yet freed.
    #[inline]
    pub unsafe fn read(user: NonNull<u8>) -> (NonNull<u8>, BlockHeader) {
        let base = NonNull::new_unchecked(user.as_ptr().sub(HEADER_SIZE));
        let header = base.as_ptr().cast::<BlockHeader>().read();
        (base, header)
    }

    /// Borrow the statistics record
    ///
    /// # Safety
    ///
    /// The block must still hold its strong reference.
    #[inline]
    pub unsafe fn stats_ref(&self) -> &MemoryStats {
        &*self.stats
    }

    /// Give back the strong reference taken by [`write`](Self::write)
    ///
    /// # Safety
    ///
    /// Must be called exactly once per written header.
    #[inline]
    pub unsafe fn release_stats(self) {
        drop(Arc::from_raw(self.stats));
    }
}
