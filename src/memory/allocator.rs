/*!
 * Instrumented Allocator
 *
 * Drop-in allocate / zeroed-allocate / reallocate / free over a backing
 * [`GlobalAlloc`], charging every block to a statistics record.
 *
 * # Accounting
 *
 * - allocate: total += size, peak raised, blocks += 1
 * - free: total -= size, blocks -= 1
 * - reallocate: total += new - old as one delta, peak raised
 * - failures leave every counter untouched
 *
 * A block is always credited back to the record it was charged to; that
 * record is found through the block header, not through the caller.
 *
 * # Call sites
 *
 * Public entry points are `#[track_caller]`, so trace records carry the
 * file and line of the code that called the allocator.
 */

use super::header::BlockHeader;
use super::stats::{MemoryStats, StatsHandle};
use super::trace::{AllocationTrace, TraceOp, TraceSink, TracingSink};
use super::types::MemoryStatsSnapshot;
use crate::core::config::AllocatorConfig;
use crate::core::limits::{BLOCK_ALIGN, HEADER_SIZE};
use crate::core::thread::current_thread_id;
use std::alloc::{GlobalAlloc, Layout, System};
use std::fmt;
use std::panic::Location;
use std::ptr::NonNull;
use std::sync::Arc;

pub struct Allocator<A: GlobalAlloc = System> {
    backend: A,
    stats: StatsHandle,
    sink: Option<Arc<dyn TraceSink>>,
}

impl Allocator<System> {
    /// System-backed allocator with a fresh default record
    pub fn new(config: &AllocatorConfig) -> Self {
        let allocator = Self::with_backend(System, MemoryStats::shared());
        if config.trace {
            allocator.with_sink(Arc::new(TracingSink))
        } else {
            allocator
        }
    }
}

impl<A: GlobalAlloc> Allocator<A> {
    /// Allocator over `backend`, charging to `stats` by default, trace off
    pub fn with_backend(backend: A, stats: StatsHandle) -> Self {
        Self {
            backend,
            stats,
            sink: None,
        }
    }

    /// Turn tracing on, sending records to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[inline]
    pub fn is_tracing(&self) -> bool {
        self.sink.is_some()
    }

    #[inline]
    pub fn backend(&self) -> &A {
        &self.backend
    }

    /// Default statistics record
    #[inline]
    pub fn stats(&self) -> &StatsHandle {
        &self.stats
    }

    #[inline]
    pub fn snapshot(&self) -> MemoryStatsSnapshot {
        self.stats.snapshot()
    }

    /// Allocate `size` bytes charged to the default record
    ///
    /// Returns `None` if the backing allocator fails.
    #[track_caller]
    pub fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        self.allocate_at(size, &self.stats, false, Location::caller())
    }

    /// Allocate `size` bytes charged to `stats`
    #[track_caller]
    pub fn allocate_in(&self, size: usize, stats: &StatsHandle) -> Option<NonNull<u8>> {
        self.allocate_at(size, stats, false, Location::caller())
    }

    /// Allocate `count * size` zeroed bytes charged to the default record
    ///
    /// Returns `None` when the product overflows.
    #[track_caller]
    pub fn zeroed_allocate(&self, count: usize, size: usize) -> Option<NonNull<u8>> {
        self.zeroed_at(count, size, &self.stats, Location::caller())
    }

    #[track_caller]
    pub fn zeroed_allocate_in(
        &self,
        count: usize,
        size: usize,
        stats: &StatsHandle,
    ) -> Option<NonNull<u8>> {
        self.zeroed_at(count, size, stats, Location::caller())
    }

    /// Resize a block, preserving its contents up to the smaller size
    ///
    /// - `ptr == None`: allocate `new_size` bytes
    /// - `new_size == 0`: free `ptr`, return `None`
    /// - failure: return `None`, `ptr` stays valid and its accounting unchanged
    ///
    /// # Safety
    ///
    /// `ptr` must be `None` or a live block from an allocator sharing this
    /// backend.
    #[track_caller]
    pub unsafe fn reallocate(&self, ptr: Option<NonNull<u8>>, new_size: usize) -> Option<NonNull<u8>> {
        self.reallocate_at(ptr, new_size, &self.stats, Location::caller())
    }

    /// As [`reallocate`](Self::reallocate); a fresh block is charged to `stats`
    ///
    /// # Safety
    ///
    /// As for [`reallocate`](Self::reallocate).
    #[track_caller]
    pub unsafe fn reallocate_in(
        &self,
        ptr: Option<NonNull<u8>>,
        new_size: usize,
        stats: &StatsHandle,
    ) -> Option<NonNull<u8>> {
        self.reallocate_at(ptr, new_size, stats, Location::caller())
    }

    /// Release a block; `None` is a no-op
    ///
    /// # Safety
    ///
    /// `ptr` must be `None` or a live block from an allocator sharing this
    /// backend. It must not be used afterwards.
    #[track_caller]
    pub unsafe fn free(&self, ptr: Option<NonNull<u8>>) {
        if let Some(user) = ptr {
            self.free_at(user, Location::caller());
        }
    }

    /// Requested size of a live block
    ///
    /// # Safety
    ///
    /// `ptr` must be a live block from an instrumented allocator.
    pub unsafe fn allocation_size(ptr: NonNull<u8>) -> usize {
        BlockHeader::read(ptr).1.size
    }

    fn zeroed_at(
        &self,
        count: usize,
        size: usize,
        stats: &StatsHandle,
        site: &'static Location<'static>,
    ) -> Option<NonNull<u8>> {
        match count.checked_mul(size) {
            Some(bytes) => self.allocate_at(bytes, stats, true, site),
            None => {
                self.emit(TraceOp::AllocFailed, 0, usize::MAX, stats, stats.total_bytes_in_use(), site);
                None
            }
        }
    }

    fn allocate_at(
        &self,
        size: usize,
        stats: &StatsHandle,
        zeroed: bool,
        site: &'static Location<'static>,
    ) -> Option<NonNull<u8>> {
        let base = BlockHeader::layout_for(size).and_then(|layout| {
            // SAFETY: layout_for never yields a zero-sized layout
            let raw = unsafe {
                if zeroed {
                    self.backend.alloc_zeroed(layout)
                } else {
                    self.backend.alloc(layout)
                }
            };
            NonNull::new(raw)
        });

        let Some(base) = base else {
            self.emit(TraceOp::AllocFailed, 0, size, stats, stats.total_bytes_in_use(), site);
            return None;
        };

        // SAFETY: base spans layout_for(size)
        let user = unsafe { BlockHeader::write(base, size, stats) };
        let total = stats.record_allocation(size);
        self.emit(TraceOp::Alloc, user.as_ptr() as usize, size, stats, total, site);
        Some(user)
    }

    unsafe fn free_at(&self, user: NonNull<u8>, site: &'static Location<'static>) {
        let (base, header) = BlockHeader::read(user);
        let stats = header.stats_ref();
        let total = stats.record_release(header.size);
        self.emit(TraceOp::Free, user.as_ptr() as usize, header.size, stats, total, site);

        self.backend.dealloc(base.as_ptr(), block_layout(header.size));
        header.release_stats();
    }

    unsafe fn reallocate_at(
        &self,
        ptr: Option<NonNull<u8>>,
        new_size: usize,
        stats: &StatsHandle,
        site: &'static Location<'static>,
    ) -> Option<NonNull<u8>> {
        let Some(user) = ptr else {
            return self.allocate_at(new_size, stats, false, site);
        };
        if new_size == 0 {
            self.free_at(user, site);
            return None;
        }

        let (base, header) = BlockHeader::read(user);
        let old_addr = user.as_ptr() as usize;
        let new_base = BlockHeader::layout_for(new_size).and_then(|layout| {
            NonNull::new(
                self.backend
                    .realloc(base.as_ptr(), block_layout(header.size), layout.size()),
            )
        });

        let charged = header.stats_ref();
        let Some(new_base) = new_base else {
            self.emit(
                TraceOp::ReallocFailed,
                old_addr,
                new_size,
                charged,
                charged.total_bytes_in_use(),
                site,
            );
            return None;
        };

        let new_user = BlockHeader::store(
            new_base,
            BlockHeader {
                size: new_size,
                stats: header.stats,
            },
        );
        let total = charged.record_resize(header.size, new_size);
        if self.is_tracing() {
            let released = total - new_size as isize;
            self.emit(TraceOp::ReallocFree, old_addr, header.size, charged, released, site);
            self.emit(TraceOp::ReallocAlloc, new_user.as_ptr() as usize, new_size, charged, total, site);
        }
        Some(new_user)
    }

    #[inline]
    fn emit(
        &self,
        op: TraceOp,
        ptr: usize,
        size: usize,
        stats: &MemoryStats,
        total: isize,
        site: &'static Location<'static>,
    ) {
        if let Some(sink) = &self.sink {
            let trace = AllocationTrace::new(
                op,
                ptr,
                size,
                total,
                stats.live_block_count(),
                site,
                current_thread_id(),
            );
            sink.record(&trace);
        }
    }
}

/// Layout of an existing block
#[inline]
fn block_layout(size: usize) -> Layout {
    // SAFETY: the same size and alignment passed Layout validation when the
    // block was allocated
    unsafe { Layout::from_size_align_unchecked(size + HEADER_SIZE, BLOCK_ALIGN) }
}

impl<A: GlobalAlloc> fmt::Debug for Allocator<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocator")
            .field("stats", &self.stats)
            .field("tracing", &self.is_tracing())
            .finish()
    }
}
