/*!
 * Allocation Trace Tests
 */

use pretty_assertions::assert_eq;
use std::alloc::System;
use std::sync::Arc;
use sysport_core::current_thread_id;
use sysport_core::memory::{Allocator, MemoryStats, RecordingSink, TraceOp};

fn traced() -> (Allocator, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let allocator = Allocator::with_backend(System, MemoryStats::shared()).with_sink(sink.clone());
    (allocator, sink)
}

#[test]
fn test_reallocate_emits_free_then_alloc() {
    let (a, sink) = traced();
    let p = a.allocate(100).unwrap();
    let p = unsafe { a.reallocate(Some(p), 50) }.unwrap();
    unsafe { a.free(Some(p)) };

    let records = sink.records();
    let ops: Vec<_> = records.iter().map(|r| r.op).collect();
    assert_eq!(
        ops,
        vec![
            TraceOp::Alloc,
            TraceOp::ReallocFree,
            TraceOp::ReallocAlloc,
            TraceOp::Free
        ]
    );

    assert_eq!(records[1].size, 100);
    assert_eq!(records[1].total_bytes_in_use, 0);
    assert_eq!(records[2].size, 50);
    assert_eq!(records[2].total_bytes_in_use, 50);
    assert_eq!(records[2].live_block_count, 1);
}

#[test]
fn test_records_carry_call_site_and_thread() {
    let (a, sink) = traced();
    let line = line!() + 1;
    let p = a.zeroed_allocate(4, 4);
    unsafe { a.free(p) };

    let records = sink.records();
    assert!(records[0].file.ends_with("trace_test.rs"));
    assert_eq!(records[0].line, line);
    assert_eq!(records[0].thread_id, current_thread_id());
    assert!(records[0].timestamp_ns <= records[1].timestamp_ns);
}

#[test]
fn test_records_serialize_for_log_shipping() {
    let (a, sink) = traced();
    let p = a.allocate(1);
    unsafe { a.free(p) };

    let json = serde_json::to_value(&sink.records()[0]).unwrap();
    assert_eq!(json["op"], "alloc");
    assert_eq!(json["size"], 1);
    assert_eq!(json["live_block_count"], 1);
}

#[test]
fn test_trace_off_by_default_without_feature() {
    let a = Allocator::with_backend(System, MemoryStats::shared());
    assert!(!a.is_tracing());
}
