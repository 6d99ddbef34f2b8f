/*!
 * Allocation Accounting Tests
 * Totals, peaks and block counts across allocate / reallocate / free
 */

use pretty_assertions::assert_eq;
use serial_test::serial;
use std::alloc::System;
use std::sync::Arc;
use std::thread;
use sysport_core::memory::{self, Allocator, MemoryStats, MemoryStatsSnapshot};

fn allocator() -> Allocator {
    Allocator::with_backend(System, MemoryStats::shared())
}

#[test]
fn test_allocate_shrink_allocate_free_sequence() {
    let a = allocator();

    let p = a.allocate(100).expect("allocate 100");
    let p = unsafe { a.reallocate(Some(p), 50) }.expect("shrink to 50");
    let q = a.allocate(200).expect("allocate 200");

    assert_eq!(
        a.snapshot(),
        MemoryStatsSnapshot {
            total_bytes_in_use: 250,
            peak_bytes_in_use: 250,
            live_block_count: 2,
        }
    );

    unsafe {
        a.free(Some(p));
        a.free(Some(q));
    }

    assert_eq!(
        a.snapshot(),
        MemoryStatsSnapshot {
            total_bytes_in_use: 0,
            peak_bytes_in_use: 250,
            live_block_count: 0,
        }
    );
}

#[test]
fn test_reallocate_to_zero_frees() {
    let a = allocator();
    let p = a.allocate(64).unwrap();
    assert!(unsafe { a.reallocate(Some(p), 0) }.is_none());
    assert_eq!(a.snapshot().total_bytes_in_use, 0);
    assert_eq!(a.snapshot().live_block_count, 0);
    assert_eq!(a.snapshot().peak_bytes_in_use, 64);
}

#[test]
fn test_reallocate_none_allocates() {
    let a = allocator();
    let p = unsafe { a.reallocate(None, 32) }.unwrap();
    assert_eq!(a.snapshot().live_block_count, 1);
    assert_eq!(a.snapshot().total_bytes_in_use, 32);
    unsafe { a.free(Some(p)) };
}

#[test]
fn test_free_none_is_noop() {
    let a = allocator();
    unsafe { a.free(None) };
    assert!(a.snapshot().is_empty());
}

#[test]
fn test_reallocate_preserves_contents() {
    let a = allocator();
    let p = a.allocate(4).unwrap();
    unsafe {
        p.as_ptr().copy_from_nonoverlapping(b"sync".as_ptr(), 4);
        let p = a.reallocate(Some(p), 4096).unwrap();
        assert_eq!(std::slice::from_raw_parts(p.as_ptr(), 4), b"sync");
        let p = a.reallocate(Some(p), 2).unwrap();
        assert_eq!(std::slice::from_raw_parts(p.as_ptr(), 2), b"sy");
        a.free(Some(p));
    }
}

#[test]
fn test_zeroed_allocate() {
    let a = allocator();
    let p = a.zeroed_allocate(16, 8).unwrap();
    unsafe {
        assert!(std::slice::from_raw_parts(p.as_ptr(), 128)
            .iter()
            .all(|b| *b == 0));
    }
    assert_eq!(a.snapshot().total_bytes_in_use, 128);
    unsafe { a.free(Some(p)) };
}

#[test]
fn test_block_credits_record_it_was_charged_to() {
    let a = allocator();
    let scoped = MemoryStats::shared();

    let p = a.allocate_in(300, &scoped).unwrap();
    let q = a.allocate(10).unwrap();
    assert_eq!(scoped.snapshot().total_bytes_in_use, 300);
    assert_eq!(a.snapshot().total_bytes_in_use, 10);

    // Resizing and freeing through the default entry points still hits `scoped`
    let p = unsafe { a.reallocate(Some(p), 400) }.unwrap();
    assert_eq!(scoped.snapshot().total_bytes_in_use, 400);
    unsafe {
        a.free(Some(p));
        a.free(Some(q));
    }
    assert!(scoped.snapshot().is_empty());
    assert!(a.snapshot().is_empty());
}

#[test]
fn test_record_outlives_caller_handle() {
    let a = allocator();
    let scoped = MemoryStats::shared();
    let p = a.allocate_in(8, &scoped).unwrap();
    let weak = Arc::downgrade(&scoped);
    drop(scoped);

    assert!(weak.upgrade().is_some(), "live block keeps its record alive");
    unsafe { a.free(Some(p)) };
    assert!(weak.upgrade().is_none());
}

#[test]
fn test_concurrent_allocations_balance() {
    let a = Arc::new(allocator());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let a = a.clone();
            thread::spawn(move || {
                let mut blocks = Vec::new();
                for i in 0..200 {
                    let block = a.allocate(16 + (t * 200 + i) % 64).unwrap();
                    blocks.push(block.as_ptr() as usize);
                }
                for addr in blocks {
                    unsafe { a.free(std::ptr::NonNull::new(addr as *mut u8)) };
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    let snap = a.snapshot();
    assert_eq!(snap.total_bytes_in_use, 0);
    assert_eq!(snap.live_block_count, 0);
    assert!(snap.peak_bytes_in_use >= 16 * 200);
}

#[test]
#[serial]
fn test_global_entry_points() {
    let before = memory::stats();
    let p = memory::allocate(24).unwrap();
    assert_eq!(memory::stats().live_block_count, before.live_block_count + 1);
    let p = unsafe { memory::reallocate(Some(p), 48) }.unwrap();
    unsafe { memory::free(Some(p)) };
    let after = memory::stats();
    assert_eq!(after.live_block_count, before.live_block_count);
    assert_eq!(after.total_bytes_in_use, before.total_bytes_in_use);
}
