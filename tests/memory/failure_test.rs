/*!
 * Allocation Failure Tests
 * A failing backend must leave accounting untouched
 */

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use sysport_core::memory::{Allocator, MemoryError, MemoryStats, RecordingSink, TraceOp, TrackedBuffer};

/// System allocator that refuses requests while `failing` is set
#[derive(Default)]
struct Flaky {
    failing: AtomicBool,
}

impl Flaky {
    fn fail(&self, on: bool) {
        self.failing.store(on, Ordering::SeqCst);
    }
}

unsafe impl GlobalAlloc for Flaky {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if self.failing.load(Ordering::SeqCst) {
            std::ptr::null_mut()
        } else {
            System.alloc(layout)
        }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        if self.failing.load(Ordering::SeqCst) {
            std::ptr::null_mut()
        } else {
            System.alloc_zeroed(layout)
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if self.failing.load(Ordering::SeqCst) {
            std::ptr::null_mut()
        } else {
            System.realloc(ptr, layout, new_size)
        }
    }
}

fn flaky() -> Allocator<Flaky> {
    Allocator::with_backend(Flaky::default(), MemoryStats::shared())
}

#[test]
fn test_failed_allocate_changes_nothing() {
    let a = flaky();
    let p = a.allocate(10).unwrap();

    a.backend().fail(true);
    assert!(a.allocate(1000).is_none());
    assert!(a.zeroed_allocate(10, 10).is_none());

    let snap = a.snapshot();
    assert_eq!(snap.total_bytes_in_use, 10);
    assert_eq!(snap.peak_bytes_in_use, 10);
    assert_eq!(snap.live_block_count, 1);

    a.backend().fail(false);
    unsafe { a.free(Some(p)) };
}

#[test]
fn test_failed_reallocate_keeps_old_block() {
    let a = flaky();
    let p = a.allocate(16).unwrap();
    unsafe { p.as_ptr().write_bytes(0xAB, 16) };

    a.backend().fail(true);
    assert!(unsafe { a.reallocate(Some(p), 1 << 20) }.is_none());
    a.backend().fail(false);

    // The old block is intact and still accounted
    assert_eq!(a.snapshot().total_bytes_in_use, 16);
    unsafe {
        assert!(std::slice::from_raw_parts(p.as_ptr(), 16)
            .iter()
            .all(|b| *b == 0xAB));
        a.free(Some(p));
    }
    assert!(a.snapshot().is_empty());
}

#[test]
fn test_failures_are_traced() {
    let sink = Arc::new(RecordingSink::new());
    let a = flaky().with_sink(sink.clone());
    let p = a.allocate(8).unwrap();

    a.backend().fail(true);
    assert!(a.allocate(8).is_none());
    assert!(unsafe { a.reallocate(Some(p), 64) }.is_none());
    a.backend().fail(false);
    unsafe { a.free(Some(p)) };

    assert_eq!(
        sink.ops(),
        vec![
            TraceOp::Alloc,
            TraceOp::AllocFailed,
            TraceOp::ReallocFailed,
            TraceOp::Free
        ]
    );
}

#[test]
fn test_buffer_reports_allocation_failure() {
    let a = flaky();
    a.backend().fail(true);
    let err = TrackedBuffer::new(&a, 64).unwrap_err();
    assert_eq!(err, MemoryError::AllocationFailed { requested: 64 });
}

#[test]
fn test_buffer_resize_failure_keeps_contents() {
    let a = flaky();
    let mut buf = TrackedBuffer::new(&a, 4).unwrap();
    buf.copy_from_slice(b"keep");

    a.backend().fail(true);
    assert!(buf.resize(1024).is_err());
    a.backend().fail(false);

    assert_eq!(&buf[..], b"keep");
    assert_eq!(a.snapshot().total_bytes_in_use, 4);
}
