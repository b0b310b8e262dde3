//! Manager and storage catalog tests

use std::sync::Arc;

use tabula_engine::Engine;
use tabula_foundation::{ErrorKind, StoreConfig};
use tabula_storage::{StorageManager, StorageManagerProvider};

fn manager() -> StorageManager {
    StorageManager::new(Arc::new(Engine::in_memory())).unwrap()
}

#[test]
fn storages_are_isolated() {
    let m = manager();
    let left = m.create_storage("left").unwrap();
    let right = m.create_storage("right").unwrap();

    left.create_array::<i32>("a").unwrap().append_value(1).unwrap();
    assert!(right.get_array::<i32>("a").unwrap().is_none());

    right.create_array::<i32>("a").unwrap();
    assert_eq!(
        right.get_array::<i32>("a").unwrap().unwrap().size().unwrap(),
        0
    );
}

#[test]
fn arrays_and_matrices_use_separate_namespaces() {
    let m = manager();
    let s = m.create_storage("s").unwrap();
    s.create_array::<i32>("x").unwrap();
    s.create_matrix::<i32>("x", 2, 2).unwrap();

    assert_eq!(s.list_array_names().unwrap(), vec!["x"]);
    assert_eq!(s.list_matrix_names().unwrap(), vec!["x"]);
    assert!(s.remove_array("x").unwrap());
    assert!(s.contains_matrix_name("x").unwrap());
}

#[test]
fn handles_outlive_lookups() {
    let m = manager();
    let s = m.create_storage("s").unwrap();
    let created = s.create_array::<String>("names").unwrap();
    let fetched = s.get_array::<String>("names").unwrap().unwrap();

    created.append_value("shared".to_string()).unwrap();
    assert_eq!(fetched.get_value(0).unwrap().as_deref(), Some("shared"));
    assert_eq!(fetched.storage_id(), s.id());
}

#[test]
fn init_retry_bound_is_configurable() {
    let engine = Arc::new(Engine::in_memory());
    let config = StoreConfig::new().with_init_retries(0);
    let err = StorageManager::with_config(engine, config).unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::TransactionExhausted { attempts: 0, .. }
    ));
}

#[test]
fn provider_managers_see_each_others_storages() {
    let mut provider = StorageManagerProvider::in_memory();
    provider.open().unwrap();

    let writer = provider.storage_manager("writer").unwrap();
    writer.create_storage("shared").unwrap();
    writer.flush_data().unwrap();

    let reader = provider.storage_manager("reader").unwrap();
    assert_eq!(reader.list_storage_names().unwrap(), vec!["shared"]);
    provider.close();
}
