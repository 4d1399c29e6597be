//! Concurrent workloads: every batch must terminate and leave a well-formed list.

#![cfg(not(loom))]

use std::collections::HashSet;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tether::workload::{self, Op, REFERENCE_CAPACITY, REFERENCE_OPS};
use tether::*;

const ROUNDS: usize = 200;

/// Runs `f` on a helper thread and fails the test if it does not finish in time.
fn within_deadline<F>(f: F)
where
    F: FnOnce() + Send + 'static,
{
    let (done_tx, done_rx) = mpsc::channel();
    let worker = thread::spawn(move || {
        f();
        let _ = done_tx.send(());
    });
    match done_rx.recv_timeout(Duration::from_secs(30)) {
        Ok(()) => worker.join().unwrap(),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            // The worker panicked; surface its panic.
            worker.join().unwrap();
        }
        Err(mpsc::RecvTimeoutError::Timeout) => panic!("workload did not terminate (deadlock or livelock)"),
    }
}

fn fixture(retry: RetryPolicy) -> OptimisticList {
    workload::reference_list(&ListConfig::new(REFERENCE_CAPACITY).with_retry(retry)).unwrap()
}

#[test]
fn test_concurrent_disjoint_operations() {
    within_deadline(|| {
        let ops = [Op::Remove(3), Op::Remove(1), Op::Remove(2), Op::InsertFront(6), Op::InsertFront(7)];
        for _ in 0..ROUNDS {
            let list = fixture(RetryPolicy::Backoff);
            workload::run_scoped(&list, &ops, ops.len());

            let members = list.snapshot();
            assert_eq!(members.len(), 5);
            let front: HashSet<_> = members[..2].iter().copied().collect();
            assert_eq!(front, HashSet::from([6, 7]));
            assert_eq!(members[2..], [4, 0, 5]);
            list.check_invariants().unwrap();
        }
    });
}

#[test]
fn test_reference_batch_replay() {
    within_deadline(|| {
        let ops = workload::decode_signed(&REFERENCE_OPS).unwrap();
        for threads in [2, 4, 9] {
            for _ in 0..ROUNDS {
                let list = fixture(RetryPolicy::Spin);
                workload::run_scoped(&list, &ops, threads);

                let members = list.snapshot();
                let set: HashSet<_> = members.iter().copied().collect();
                assert_eq!(set, HashSet::from([0, 5, 6, 7, 8, 9, 10]));
                assert_eq!(members[5..], [0, 5]);
                list.check_invariants().unwrap();
            }
        }
    });
}

#[test]
fn test_no_lost_inserts() {
    within_deadline(|| {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 100;

        let initial = [0, 1, 2];
        let list = OptimisticList::from_order(3 + THREADS * PER_THREAD, &initial).unwrap();

        thread::scope(|s| {
            for t in 0..THREADS {
                let list = &list;
                s.spawn(move || {
                    for i in 0..PER_THREAD {
                        list.insert_front(3 + t * PER_THREAD + i);
                    }
                });
            }
        });

        let members = list.snapshot();
        assert_eq!(members.len(), 3 + THREADS * PER_THREAD);
        assert_eq!(members[members.len() - 3..], initial);
        let unique: HashSet<_> = members.iter().copied().collect();
        assert_eq!(unique.len(), members.len());
        assert_eq!(list.stats().inserts, (THREADS * PER_THREAD) as u64);
        list.check_invariants().unwrap();
    });
}

#[test]
fn test_head_removal_races_front_insertion() {
    // Positional lock order lets these two deadlock; the canonical order must not.
    within_deadline(|| {
        for _ in 0..ROUNDS {
            let list = OptimisticList::from_order(64, &[0, 1, 2]).unwrap();
            thread::scope(|s| {
                s.spawn(|| list.remove(0));
                s.spawn(|| {
                    for id in 10..40 {
                        list.insert_front(id);
                    }
                });
                s.spawn(|| list.remove(1));
            });

            assert_eq!(list.len(), 31);
            assert!(!list.contains(0));
            assert!(!list.contains(1));
            assert_eq!(list.snapshot().last(), Some(&2));
            list.check_invariants().unwrap();
        }
    });
}

#[test]
fn test_churn_on_owned_ranges() {
    // Every thread removes and reinserts only its own ids, so each call meets its contract.
    within_deadline(|| {
        const THREADS: usize = 6;
        const OWNED: usize = 8;
        const ITERATIONS: usize = 300;

        let order: Vec<NodeId> = (0..THREADS * OWNED).collect();
        let list = OptimisticList::from_order(THREADS * OWNED, &order).unwrap();

        thread::scope(|s| {
            for t in 0..THREADS {
                let list = &list;
                s.spawn(move || {
                    let owned = t * OWNED..(t + 1) * OWNED;
                    for round in 0..ITERATIONS {
                        let id = owned.start + round % OWNED;
                        list.remove(id);
                        list.insert_front(id);
                    }
                });
            }
        });

        assert_eq!(list.len(), THREADS * OWNED);
        let unique: HashSet<_> = list.snapshot().into_iter().collect();
        assert_eq!(unique.len(), THREADS * OWNED);
        let stats = list.stats();
        assert_eq!(stats.removes, (THREADS * ITERATIONS) as u64);
        assert_eq!(stats.inserts, (THREADS * ITERATIONS) as u64);
        list.check_invariants().unwrap();
    });
}

#[test]
fn test_snapshot_during_mutation_terminates() {
    within_deadline(|| {
        let list = Arc::new(OptimisticList::from_order(128, &[0]).unwrap());

        let writer = {
            let list = Arc::clone(&list);
            thread::spawn(move || {
                for round in 0..50 {
                    for id in 1..128 {
                        list.insert_front(id);
                    }
                    for id in 1..128 {
                        list.remove(id);
                    }
                    assert_eq!(list.len(), 1, "round {round}");
                }
            })
        };

        while !writer.is_finished() {
            let seen = list.snapshot();
            assert!(seen.len() <= list.capacity());
        }
        writer.join().unwrap();

        assert_eq!(list.snapshot(), vec![0]);
        list.check_invariants().unwrap();
    });
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_replay() {
    within_deadline(|| {
        let ops = workload::decode_signed(&REFERENCE_OPS).unwrap();
        for _ in 0..ROUNDS {
            let list = fixture(RetryPolicy::Backoff);
            workload::run_parallel(&list, &ops);
            assert_eq!(list.len(), 7);
            list.check_invariants().unwrap();
        }
    });
}
