/*!
 * Atomic Counter Integration Tests
 *
 * Concurrency and algebraic properties of the counter facility on both the
 * hardware and the fallback-lock backend
 */

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::AtomicIsize;
use std::sync::{Arc, Barrier};
use std::thread;
use sysport_core::core::atomic::{Counter, CounterCell, LockedCell};

fn concurrent_sum<C: CounterCell<isize> + 'static>(threads: usize, deltas: Vec<Vec<isize>>) -> isize {
    let counter = Arc::new(Counter::<C>::new(0));
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = deltas
        .into_iter()
        .map(|ops| {
            let counter = counter.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for d in ops {
                    counter.add(d);
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
    counter.load()
}

fn random_deltas(seed: u64, threads: usize, per_thread: usize) -> (Vec<Vec<isize>>, isize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let deltas: Vec<Vec<isize>> = (0..threads)
        .map(|_| (0..per_thread).map(|_| rng.gen_range(-1000..=1000)).collect())
        .collect();
    let expected = deltas.iter().flatten().sum();
    (deltas, expected)
}

#[test]
fn test_concurrent_adds_hardware() {
    let (deltas, expected) = random_deltas(7, 8, 2_000);
    assert_eq!(concurrent_sum::<AtomicIsize>(8, deltas), expected);
}

#[test]
fn test_concurrent_adds_fallback_lock() {
    let (deltas, expected) = random_deltas(11, 8, 2_000);
    assert_eq!(concurrent_sum::<LockedCell<isize>>(8, deltas), expected);
}

/// Exactly one of many racing compare-and-swaps from the same expected value wins
fn cas_single_winner<C: CounterCell<isize> + 'static>() {
    let counter = Arc::new(Counter::<C>::new(0));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (1..=8)
        .map(|id| {
            let counter = counter.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                counter.compare_and_swap(0, id) == 0
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
    assert!((1..=8).contains(&counter.load()));
}

#[test]
fn test_cas_single_winner_hardware() {
    cas_single_winner::<AtomicIsize>();
}

#[test]
fn test_cas_single_winner_fallback_lock() {
    cas_single_winner::<LockedCell<isize>>();
}

proptest! {
    #[test]
    fn prop_increment_then_decrement_is_identity(start in -1_000_000isize..1_000_000) {
        let hw = Counter::<AtomicIsize>::new(start);
        let locked = Counter::<LockedCell<isize>>::new(start);
        prop_assert_eq!(hw.increment(), start + 1);
        prop_assert_eq!(hw.decrement(), start);
        prop_assert_eq!(locked.increment(), start + 1);
        prop_assert_eq!(locked.decrement(), start);
    }

    #[test]
    fn prop_add_returns_running_sum(deltas in prop::collection::vec(-10_000isize..10_000, 0..64)) {
        let hw = Counter::<AtomicIsize>::new(0);
        let locked = Counter::<LockedCell<isize>>::new(0);
        let mut sum = 0isize;
        for d in deltas {
            sum += d;
            prop_assert_eq!(hw.add(d), sum);
            prop_assert_eq!(locked.add(d), sum);
        }
    }

    #[test]
    fn prop_cas_swaps_iff_expected_matches(
        current in any::<isize>(),
        guess in any::<isize>(),
        hit in any::<bool>(),
        new in any::<isize>(),
    ) {
        let expected = if hit { current } else { guess };
        let want = if current == expected { new } else { current };

        let hw = Counter::<AtomicIsize>::new(current);
        prop_assert_eq!(hw.compare_and_swap(expected, new), current);
        prop_assert_eq!(hw.load(), want);

        let locked = Counter::<LockedCell<isize>>::new(current);
        prop_assert_eq!(locked.compare_and_swap(expected, new), current);
        prop_assert_eq!(locked.load(), want);
    }

    #[test]
    fn prop_max_is_running_maximum(
        start in any::<isize>(),
        values in prop::collection::vec(any::<isize>(), 1..64),
    ) {
        let hw = Counter::<AtomicIsize>::new(start);
        let locked = Counter::<LockedCell<isize>>::new(start);
        let mut running = start;
        for v in &values {
            hw.max(*v);
            locked.max(*v);
            running = running.max(*v);
            prop_assert_eq!(hw.load(), running);
            prop_assert_eq!(locked.load(), running);
        }
    }
}
