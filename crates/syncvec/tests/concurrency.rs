//! Integration tests for the synchronized sequence's concurrency contract.
//!
//! These exercise the container from many real threads at once: mutation
//! serialization, snapshot consistency of reads, completion delivery on the
//! fixed notification context, and drain-on-drop.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use syncvec::{NotifyContext, SequenceError, SynchronizedSequence};

#[test]
fn test_concurrent_appends_net_count() {
    let seq = Arc::new(SynchronizedSequence::new());
    let num_threads = 8;
    let ops_per_thread = 500;

    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let seq = Arc::clone(&seq);
            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    seq.append(t * ops_per_thread + i);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    seq.flush();

    assert_eq!(seq.len(), num_threads * ops_per_thread);

    // Per-thread submission order survives the interleaving: each thread's
    // own elements appear in increasing order.
    let elements = seq.all_elements();
    for t in 0..num_threads {
        let own: Vec<usize> = elements
            .iter()
            .copied()
            .filter(|x| x / ops_per_thread == t)
            .collect();
        let mut sorted = own.clone();
        sorted.sort_unstable();
        assert_eq!(own, sorted, "thread {t} submission order not preserved");
    }
}

#[test]
fn test_concurrent_insert_and_remove_settles_to_net_zero() {
    // Start with [0, 1, ..., 100], submit one insert and one remove with no
    // ordering relation between them. Net effect on the count must be zero,
    // and no overlapping query may see a count outside {100, 101, 102}.
    let seq = Arc::new(SynchronizedSequence::from_vec((0..=100).collect::<Vec<i32>>()));
    assert_eq!(seq.len(), 101);

    let stop = Arc::new(AtomicBool::new(false));
    let monitor = {
        let seq = Arc::clone(&seq);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let count = seq.len();
                assert!(
                    (100..=102).contains(&count),
                    "observed torn count {count}"
                );
            }
        })
    };

    let inserter = {
        let seq = Arc::clone(&seq);
        thread::spawn(move || seq.insert(999, 50))
    };
    let remover = {
        let seq = Arc::clone(&seq);
        thread::spawn(move || seq.remove_at(50))
    };
    inserter.join().unwrap();
    remover.join().unwrap();
    seq.flush();

    assert_eq!(seq.len(), 101);

    stop.store(true, Ordering::Relaxed);
    monitor.join().unwrap();
}

#[test]
fn test_bulk_appends_are_atomic_to_readers() {
    // Each batch is 50 copies of one marker. A reader must see each marker
    // 0 or 50 times, never a partial batch.
    let seq: Arc<SynchronizedSequence<usize>> = Arc::new(SynchronizedSequence::new());
    let num_batches = 40;
    let batch_size = 50;

    let writer = {
        let seq = Arc::clone(&seq);
        thread::spawn(move || {
            for marker in 0..num_batches {
                seq.append_many(vec![marker; batch_size]);
            }
        })
    };

    let reader = {
        let seq = Arc::clone(&seq);
        thread::spawn(move || {
            for _ in 0..200 {
                let snapshot = seq.all_elements();
                for marker in 0..num_batches {
                    let seen = snapshot.iter().filter(|x| **x == marker).count();
                    assert!(
                        seen == 0 || seen == batch_size,
                        "torn batch: marker {marker} seen {seen} times"
                    );
                }
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
    seq.flush();
    assert_eq!(seq.len(), num_batches * batch_size);
}

#[test]
fn test_randomized_mutation_mix_accounts_for_every_element() {
    // Deterministic seed: every run exercises the same interleaving space.
    let seq: Arc<SynchronizedSequence<u64>> = Arc::new(SynchronizedSequence::new());
    let successful_removals = Arc::new(AtomicUsize::new(0));
    let num_threads = 6;
    let ops_per_thread = 400;
    let (done_tx, done_rx) = mpsc::channel();

    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let seq = Arc::clone(&seq);
            let removals = Arc::clone(&successful_removals);
            let done_tx = done_tx.clone();
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(0xC0FFEE + t);
                for _ in 0..ops_per_thread {
                    if rng.gen_bool(0.6) {
                        seq.append(rng.gen());
                    } else {
                        let removals = Arc::clone(&removals);
                        let done_tx = done_tx.clone();
                        seq.remove_at_then(rng.gen_range(0..64), move |outcome| {
                            if outcome.is_ok() {
                                removals.fetch_add(1, Ordering::Relaxed);
                            }
                            done_tx.send(()).unwrap();
                        });
                    }
                }
            })
        })
        .collect();
    drop(done_tx);

    let mut total_appends = 0;
    let mut total_removal_attempts = 0;
    for h in handles {
        h.join().unwrap();
    }
    seq.flush();

    // Every removal completion fires exactly once.
    while done_rx.recv().is_ok() {
        total_removal_attempts += 1;
    }
    for t in 0..num_threads {
        let mut rng = StdRng::seed_from_u64(0xC0FFEE + t);
        for _ in 0..ops_per_thread {
            if rng.gen_bool(0.6) {
                let _: u64 = rng.gen();
                total_appends += 1;
            } else {
                let _: usize = rng.gen_range(0..64);
            }
        }
    }
    assert_eq!(
        total_appends + total_removal_attempts,
        num_threads as usize * ops_per_thread
    );

    // Net count: appends minus removals that actually found their index.
    let removed = successful_removals.load(Ordering::Relaxed);
    assert_eq!(seq.len(), total_appends - removed);
}

#[test]
fn test_completions_arrive_on_one_fixed_thread() {
    let ctx = NotifyContext::new();
    let seq = Arc::new(SynchronizedSequence::with_notify(ctx.handle()));
    let (tx, rx) = mpsc::channel();

    let submitters: Vec<_> = (0..4)
        .map(|t| {
            let seq = Arc::clone(&seq);
            let tx = tx.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    let tx = tx.clone();
                    seq.insert_then(t * 50 + i, 0, move |outcome| {
                        assert_eq!(outcome, Ok(()));
                        tx.send(thread::current().id()).unwrap();
                    });
                }
            })
        })
        .collect();
    let submitter_ids: Vec<_> = submitters
        .into_iter()
        .map(|h| {
            let id = h.thread().id();
            h.join().unwrap();
            id
        })
        .collect();
    drop(tx);

    let delivery_ids: Vec<_> = rx.iter().collect();
    assert_eq!(delivery_ids.len(), 200);
    let fixed = delivery_ids[0];
    assert!(delivery_ids.iter().all(|id| *id == fixed));
    assert!(!submitter_ids.contains(&fixed));
    assert_ne!(fixed, thread::current().id());
}

#[test]
fn test_shared_notify_context_serves_multiple_sequences() {
    let ctx = NotifyContext::new();
    let a = SynchronizedSequence::from_vec_with_notify(vec![1, 2, 3], ctx.handle());
    let b = SynchronizedSequence::from_vec_with_notify(vec![4, 5, 6], ctx.handle());

    let (tx, rx) = mpsc::channel();
    let tx2 = tx.clone();
    a.remove_at_then(0, move |outcome| {
        tx.send((thread::current().id(), outcome)).unwrap();
    });
    b.remove_at_then(0, move |outcome| {
        tx2.send((thread::current().id(), outcome)).unwrap();
    });

    let (id_a, removed_a) = rx.recv().unwrap();
    let (id_b, removed_b) = rx.recv().unwrap();
    assert_eq!(id_a, id_b);
    let mut removed = vec![removed_a.unwrap(), removed_b.unwrap()];
    removed.sort_unstable();
    assert_eq!(removed, vec![1, 4]);
}

#[test]
fn test_drop_drains_queued_mutations() {
    let ctx = NotifyContext::new();
    let seq = SynchronizedSequence::with_notify(ctx.handle());
    let (tx, rx) = mpsc::channel();

    for i in 0..64 {
        seq.append(i);
    }
    seq.clear_then(move |snapshot| tx.send(snapshot).unwrap());
    drop(seq);

    // Every queued mutation ran before the writer exited: the clear saw all
    // 64 appends.
    assert_eq!(rx.recv().unwrap(), (0..64).collect::<Vec<_>>());
}

#[test]
fn test_stale_index_is_reported_not_undefined() {
    let seq = SynchronizedSequence::from_vec((0..10).collect::<Vec<i32>>());
    let (tx, rx) = mpsc::channel();

    // Valid when submitted; the clear admitted ahead of it invalidates it.
    seq.clear();
    seq.remove_at_then(5, move |outcome| tx.send(outcome).unwrap());

    assert_eq!(
        rx.recv().unwrap(),
        Err(SequenceError::IndexOutOfBounds { index: 5, len: 0 })
    );
}

#[test]
fn test_queries_interleave_with_heavy_mutation() {
    let seq: Arc<SynchronizedSequence<i32>> =
        Arc::new(SynchronizedSequence::from_vec((0..256).collect()));
    let stop = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let seq = Arc::clone(&seq);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut max_len = 0;
                while !stop.load(Ordering::Relaxed) {
                    // Mixed query load under concurrent writes. None of
                    // these may deadlock, fault, or observe a torn state.
                    let snapshot = seq.all_elements();
                    max_len = max_len.max(snapshot.len());
                    let _ = seq.first_where(|x| *x % 3 == 0);
                    let _ = seq.fold(0i64, |acc, x| acc + i64::from(*x));
                    let sorted = seq.sorted();
                    assert!(sorted.windows(2).all(|w| w[0] <= w[1]));
                }
                assert!(max_len >= 256, "readers never saw the initial state");
            })
        })
        .collect();

    for round in 0..50 {
        seq.insert(round, 0);
        seq.remove_at(0);
        seq.set(10, round);
        seq.remove_where(move |x| *x == round);
        seq.append_many(vec![round; 4]);
    }
    seq.flush();

    stop.store(true, Ordering::Relaxed);
    for r in readers {
        r.join().unwrap();
    }
}
