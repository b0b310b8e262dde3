//! Transaction semantics tests

use tabula_engine::{Engine, StructureKind};
use tabula_foundation::ErrorKind;

// =============================================================================
// Reads of missing structures
// =============================================================================

#[test]
fn missing_structures_read_as_empty() {
    let engine = Engine::in_memory();
    let mut tx = engine.begin().unwrap();

    assert_eq!(tx.long_get("counter").unwrap(), 0);
    assert_eq!(tx.var_get::<String>("default").unwrap(), None);
    assert_eq!(tx.tree_len("values").unwrap(), 0);
    assert!(tx.hash_keys("catalog").unwrap().is_empty());
    assert!(!tx.has_writes());
}

#[test]
fn create_makes_empty_structures_visible() {
    let engine = Engine::in_memory();
    let mut tx = engine.begin().unwrap();
    for (name, kind) in [
        ("t", StructureKind::TreeMap),
        ("h", StructureKind::HashMap),
        ("l", StructureKind::AtomicLong),
        ("v", StructureKind::AtomicVar),
    ] {
        tx.create(name, kind).unwrap();
    }
    tx.commit().unwrap();

    assert_eq!(engine.structure_names(), vec!["h", "l", "t", "v"]);
}

// =============================================================================
// Commit validation
// =============================================================================

#[test]
fn read_only_transactions_never_conflict() {
    let engine = Engine::in_memory();
    let mut reader = engine.begin().unwrap();
    reader.long_get("counter").unwrap();

    let mut writer = engine.begin().unwrap();
    writer.long_set("counter", 3).unwrap();
    writer.commit().unwrap();

    reader.commit().unwrap();
}

#[test]
fn conflicting_commit_applies_nothing() {
    let engine = Engine::in_memory();
    let mut first = engine.begin().unwrap();
    let mut second = engine.begin().unwrap();

    first.hash_put("catalog", "a", &0u64).unwrap();
    second.hash_put("catalog", "b", &1u64).unwrap();
    second.long_set("other", 9).unwrap();

    first.commit().unwrap();
    let err = second.commit().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Conflict(ref name) if name == "catalog"));

    let mut tx = engine.begin().unwrap();
    assert_eq!(tx.hash_keys("catalog").unwrap(), vec!["a"]);
    assert_eq!(tx.long_get("other").unwrap(), 0);
}

#[test]
fn delete_and_recreate_in_one_transaction() {
    let engine = Engine::in_memory();
    let mut tx = engine.begin().unwrap();
    tx.tree_put("values", 1, &"old").unwrap();
    tx.commit().unwrap();

    let mut tx = engine.begin().unwrap();
    tx.delete("values");
    tx.tree_put("values", 2, &"new").unwrap();
    tx.commit().unwrap();

    let mut tx = engine.begin().unwrap();
    let entries: Vec<(u64, String)> = tx.tree_range("values", ..).unwrap();
    assert_eq!(entries, vec![(2, "new".to_string())]);
}
