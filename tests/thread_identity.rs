/*!
 * Thread Identity Integration Tests
 */

use pretty_assertions::assert_eq;
use serial_test::serial;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use sysport_core::core::config::IdentityConfig;
use sysport_core::core::thread::{registered_thread_id, RegistryStats};
use sysport_core::{current_thread_id, register_worker, ThreadRegistry, ThreadRole};

#[test]
fn test_identity_stable_for_thread_lifetime() {
    let first = current_thread_id();
    for _ in 0..100 {
        assert_eq!(current_thread_id(), first);
    }
}

#[test]
fn test_simultaneous_threads_get_distinct_identities() {
    const THREADS: usize = 16;
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let barrier = barrier.clone();
            thread::spawn(move || {
                let id = current_thread_id();
                let registered = registered_thread_id();
                barrier.wait();
                assert_eq!(current_thread_id(), id);
                (id, registered)
            })
        })
        .collect();

    let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let native: HashSet<_> = ids.iter().map(|(n, _)| n).collect();
    let registered: HashSet<_> = ids.iter().map(|(_, r)| r).collect();
    assert_eq!(native.len(), THREADS);
    assert_eq!(registered.len(), THREADS);
}

#[test]
#[serial]
fn test_worker_registration_on_global_registry() {
    thread::spawn(|| {
        let index = register_worker(Some(Arc::new("worker-0")));
        assert_eq!(registered_thread_id(), index);

        let registry = ThreadRegistry::global();
        assert_eq!(registry.role(), ThreadRole::Worker);
        let data = registry.user_data().unwrap();
        assert_eq!(data.downcast_ref::<&str>(), Some(&"worker-0"));
    })
    .join()
    .unwrap();
}

#[test]
fn test_registry_stats_track_thread_exit() {
    let registry = Arc::new(ThreadRegistry::new(&IdentityConfig {
        foreign_thread_limit: 2,
    }));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let registry = registry.clone();
            thread::spawn(move || {
                if i % 2 == 0 {
                    registry.register_worker(None)
                } else {
                    registry.resolve()
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(
        registry.stats(),
        RegistryStats {
            issued: 4,
            live_workers: 0,
            live_foreign: 0,
            foreign_limit: 2,
        }
    );
}

#[test]
fn test_live_counts_while_threads_run() {
    let registry = Arc::new(ThreadRegistry::new(&IdentityConfig::default()));
    let entered = Arc::new(Barrier::new(4));
    let release = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let registry = registry.clone();
            let entered = entered.clone();
            let release = release.clone();
            thread::spawn(move || {
                registry.resolve();
                entered.wait();
                release.wait();
            })
        })
        .collect();

    entered.wait();
    let stats = registry.stats();
    release.wait();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(stats.live_foreign, 3);
    assert_eq!(stats.live_workers, 0);
}
