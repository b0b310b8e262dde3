//! Shared handles across threads

use std::sync::Arc;
use std::thread;

use tabula_engine::Engine;
use tabula_foundation::StoreConfig;
use tabula_storage::StorageManager;

#[test]
fn concurrent_appends_lose_nothing() {
    let engine = Arc::new(Engine::in_memory());
    // Appends all touch the same size counter, so allow plenty of retries.
    let config = StoreConfig::new().with_max_retries(10_000);
    let manager = StorageManager::with_config(engine, config).unwrap();
    let array = manager
        .create_storage("s")
        .unwrap()
        .create_array::<u64>("log")
        .unwrap();

    let handles: Vec<_> = (0..4u64)
        .map(|worker| {
            let array = array.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    array.append_value(worker * 100 + i).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut values: Vec<u64> = array.to_vec().unwrap().into_iter().flatten().collect();
    assert_eq!(values.len(), 100);
    values.sort_unstable();
    values.dedup();
    assert_eq!(values.len(), 100);
}

#[test]
fn concurrent_storage_creation_yields_one_id_per_name() {
    let engine = Arc::new(Engine::in_memory());
    let config = StoreConfig::new().with_max_retries(10_000);
    let manager = StorageManager::with_config(engine, config).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let manager = manager.clone();
            thread::spawn(move || manager.create_storage("shared").unwrap().id())
        })
        .collect();
    let ids: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(manager.list_storage_names().unwrap(), vec!["shared"]);
}
