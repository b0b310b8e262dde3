//! Multi-threaded retry executor tests

use std::sync::Arc;
use std::thread;

use tabula_engine::{Engine, atomic, atomic_get};

#[test]
fn concurrent_increments_are_serialized() {
    let engine = Arc::new(Engine::in_memory());
    let threads = 4;
    let per_thread = 50;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..per_thread {
                    // Generous bound: contention here is deliberate.
                    atomic(&engine, 1_000, |tx| tx.long_get_and_add("counter", 1).map(drop))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let total = atomic_get(&engine, 1, |tx| tx.long_get("counter")).unwrap();
    assert_eq!(total, threads * per_thread);
}

#[test]
fn allocated_ids_are_unique() {
    let engine = Arc::new(Engine::in_memory());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                (0..25)
                    .map(|_| atomic_get(&engine, 1_000, |tx| tx.long_get_and_add("ids", 1)).unwrap())
                    .collect::<Vec<u64>>()
            })
        })
        .collect();

    let mut ids: Vec<u64> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (0..100).collect::<Vec<u64>>());
}
