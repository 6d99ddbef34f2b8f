/*!
 * Memory Statistics
 *
 * Three counters per record: bytes in use, peak bytes in use, live blocks.
 * Records are shared by `Arc`; every live block holds a strong reference to
 * the record it was charged to, so a record outlives its last allocation.
 */

use super::types::MemoryStatsSnapshot;
use crate::core::atomic::Counter;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a statistics record
pub type StatsHandle = Arc<MemoryStats>;

/// Allocation accounting record
///
/// Each field is updated indivisibly; fields are not updated together, so
/// concurrent readers may see one field ahead of another.
#[derive(Default)]
pub struct MemoryStats {
    total_bytes_in_use: Counter,
    peak_bytes_in_use: Counter,
    live_block_count: Counter,
}

impl MemoryStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh record behind a shared handle
    pub fn shared() -> StatsHandle {
        Arc::new(Self::new())
    }

    /// Charge a new block; returns the new total
    pub(crate) fn record_allocation(&self, size: usize) -> isize {
        let total = self.total_bytes_in_use.add(size as isize);
        self.peak_bytes_in_use.max(total);
        self.live_block_count.increment();
        total
    }

    /// Credit a released block; returns the new total
    pub(crate) fn record_release(&self, size: usize) -> isize {
        let total = self.total_bytes_in_use.add(-(size as isize));
        self.live_block_count.decrement();
        total
    }

    /// Apply a resize as one delta; the block count is unchanged
    pub(crate) fn record_resize(&self, old_size: usize, new_size: usize) -> isize {
        let delta = new_size as isize - old_size as isize;
        let total = self.total_bytes_in_use.add(delta);
        self.peak_bytes_in_use.max(total);
        total
    }

    #[inline]
    pub fn total_bytes_in_use(&self) -> isize {
        self.total_bytes_in_use.load()
    }

    #[inline]
    pub fn peak_bytes_in_use(&self) -> isize {
        self.peak_bytes_in_use.load()
    }

    #[inline]
    pub fn live_block_count(&self) -> isize {
        self.live_block_count.load()
    }

    pub fn snapshot(&self) -> MemoryStatsSnapshot {
        let total = self.total_bytes_in_use().max(0) as usize;
        let peak = self.peak_bytes_in_use().max(0) as usize;
        MemoryStatsSnapshot {
            total_bytes_in_use: total,
            peak_bytes_in_use: peak.max(total),
            live_block_count: self.live_block_count().max(0) as usize,
        }
    }
}

impl fmt::Debug for MemoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStats")
            .field("total_bytes_in_use", &self.total_bytes_in_use())
            .field("peak_bytes_in_use", &self.peak_bytes_in_use())
            .field("live_block_count", &self.live_block_count())
            .finish()
    }
}
