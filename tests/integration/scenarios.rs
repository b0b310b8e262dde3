//! End-to-end scenarios

use std::sync::Arc;

use tabula_engine::Engine;
use tabula_storage::StorageManager;

fn manager() -> StorageManager {
    StorageManager::new(Arc::new(Engine::in_memory())).unwrap()
}

#[test]
fn array_append_then_truncate() {
    let m = manager();
    let s = m.create_storage("s1").unwrap();
    let a = s.create_array::<f64>("a").unwrap();

    for v in [3.0, 4.0, 5.0] {
        a.append_value(v).unwrap();
    }
    assert_eq!(a.size().unwrap(), 3);
    assert_eq!(
        a.get_values(0, 3).unwrap(),
        vec![Some(3.0), Some(4.0), Some(5.0)]
    );

    a.resize(1).unwrap();
    assert_eq!(a.get_value(0).unwrap(), Some(3.0));
    assert_eq!(a.get_values(0, 3).unwrap(), vec![Some(3.0)]);
}

#[test]
fn matrix_resize_resets_cells() {
    let m = manager();
    let s = m.create_storage("s1").unwrap();
    let matrix = s.create_matrix::<String>("m", 1, 1).unwrap();

    matrix.resize(5, 5).unwrap();
    matrix.set_value(2, 2, "x".to_string()).unwrap();
    assert_eq!(matrix.get_value(2, 2).unwrap().as_deref(), Some("x"));
    assert_eq!(matrix.get_value(0, 0).unwrap(), None);

    matrix.resize(5, 5).unwrap();
    assert_eq!(matrix.get_value(2, 2).unwrap(), None);
}

#[test]
fn removed_storage_is_recreated_empty() {
    let m = manager();
    let s = m.create_storage("s1").unwrap();
    s.create_array::<f64>("a").unwrap().append_value(1.0).unwrap();
    s.create_matrix::<f64>("m", 2, 2).unwrap();

    m.remove_storage("s1").unwrap();
    assert!(m.get_storage("s1").unwrap().is_none());

    let fresh = m.create_storage("s1").unwrap();
    assert!(fresh.list_array_names().unwrap().is_empty());
    assert!(fresh.list_matrix_names().unwrap().is_empty());
    assert!(fresh.get_array::<f64>("a").unwrap().is_none());
}
