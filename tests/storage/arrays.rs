//! Sparse array tests

use std::sync::Arc;

use tabula_engine::Engine;
use tabula_foundation::ErrorKind;
use tabula_storage::{SparseArray, Storage, StorageManager};

fn storage() -> Storage {
    StorageManager::new(Arc::new(Engine::in_memory()))
        .unwrap()
        .create_storage("s")
        .unwrap()
}

// =============================================================================
// Reads and writes
// =============================================================================

#[test]
fn set_then_get_returns_value_or_default() {
    let s = storage();
    let a: SparseArray<u32> = s.create_array("a").unwrap();
    a.resize(10).unwrap();
    a.set_default_value(42).unwrap();

    a.set_value(3, 7).unwrap();
    assert_eq!(a.get_value(3).unwrap(), Some(7));
    a.set_value(3, None).unwrap();
    assert_eq!(a.get_value(3).unwrap(), Some(42));
    assert_eq!(a.get_value(9).unwrap(), Some(42));
}

#[test]
fn append_grows_by_exactly_one() {
    let s = storage();
    let a = s.create_array::<String>("a").unwrap();
    for (i, word) in ["x", "y", "z"].into_iter().enumerate() {
        a.append_value(word.to_string()).unwrap();
        assert_eq!(a.size().unwrap(), i as u64 + 1);
        assert_eq!(a.get_value(i as u64).unwrap().as_deref(), Some(word));
    }
}

#[test]
fn append_values_fills_a_block() {
    let s = storage();
    let a = s.create_array::<i8>("a").unwrap();
    a.append_value(1).unwrap();
    a.append_values(3, 2).unwrap();
    assert_eq!(
        a.to_vec().unwrap(),
        vec![Some(1), Some(2), Some(2), Some(2)]
    );
}

#[test]
fn resize_round_trip_reads_default() {
    let s = storage();
    let a = s.create_array::<f32>("a").unwrap();
    a.append_values(5, 1.0).unwrap();
    a.resize(2).unwrap();
    a.resize(5).unwrap();
    assert_eq!(a.size().unwrap(), 5);
    assert_eq!(a.get_values(2, 5).unwrap(), vec![None, None, None]);
}

#[test]
fn errors_are_classified() {
    let s = storage();
    let a = s.create_array::<i32>("a").unwrap();

    let err = a.get_value(0).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::IndexOutOfRange { index: 0, bound: 0 }));
    let err = a.append_values(2, None).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NullValue));
    let err = a.iter_provider(0).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidArgument(_)));
}

#[test]
fn append_to_a_full_array_is_an_error() {
    let s = storage();
    let a = s.create_array::<u8>("a").unwrap();
    a.resize(u64::MAX).unwrap();

    let err = a.append_value(1).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidArgument(_)));
    assert_eq!(a.size().unwrap(), u64::MAX);
}

// =============================================================================
// Bulk copies
// =============================================================================

#[test]
fn copy_to_then_back_reproduces_source() {
    let s = storage();
    let a = s.create_array::<i32>("a").unwrap();
    a.copy_from_values((0..25).map(|i| (i % 3 != 0).then_some(i)), false, 4)
        .unwrap();

    let b = s.create_array::<i32>("b").unwrap();
    a.copy_to(&b, false, 7).unwrap();
    let c = s.create_array::<i32>("c").unwrap();
    c.copy_from(&b, false, 3).unwrap();

    assert_eq!(c.to_vec().unwrap(), a.to_vec().unwrap());
    assert_eq!(c.size().unwrap(), 25);
}

#[test]
fn copy_with_clear_replaces_content() {
    let s = storage();
    let a = s.create_array::<i32>("a").unwrap();
    a.append_values(10, 0).unwrap();
    a.copy_from_values([1, 2], true, 1).unwrap();
    assert_eq!(a.to_vec().unwrap(), vec![Some(1), Some(2)]);
}

#[test]
fn copy_to_vec_appends_unless_cleared() {
    let s = storage();
    let a = s.create_array::<i32>("a").unwrap();
    a.append_values(2, 5).unwrap();

    let mut out = vec![Some(0)];
    a.copy_to_vec(&mut out, false, 1).unwrap();
    assert_eq!(out, vec![Some(0), Some(5), Some(5)]);
    a.copy_to_vec(&mut out, true, 1).unwrap();
    assert_eq!(out, vec![Some(5), Some(5)]);
}

// =============================================================================
// Iteration
// =============================================================================

#[test]
fn indexed_provider_yields_every_slot() {
    let s = storage();
    let a = s.create_array::<char>("a").unwrap();
    a.copy_from_values(['a', 'b', 'c', 'd', 'e'], false, 2).unwrap();

    let provider = a.iter_provider_with_index(2).unwrap();
    let indices: Vec<u64> = (&provider)
        .into_iter()
        .map(|entry| entry.unwrap().0)
        .collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    // Restartable.
    assert_eq!(provider.iter().count(), 5);
}
