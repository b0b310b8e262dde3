//! Disk backing tests

use tabula_engine::persist::DiskStore;
use tabula_engine::{Backing, Engine, EngineConfig};
use tabula_foundation::ErrorKind;

#[test]
fn commits_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");

    {
        let engine = Engine::open(EngineConfig::file(&path)).unwrap();
        let mut tx = engine.begin().unwrap();
        tx.tree_put("values", 4, &2.5f64).unwrap();
        tx.hash_put("catalog", "a", &7u64).unwrap();
        tx.var_set("default", Some(&"d")).unwrap();
        tx.commit().unwrap();
    }

    let engine = Engine::open(EngineConfig::file(&path).with_create_if_missing(false)).unwrap();
    assert!(matches!(engine.backing(), Backing::File { .. }));
    let mut tx = engine.begin().unwrap();
    assert_eq!(tx.tree_get::<f64>("values", 4).unwrap(), Some(2.5));
    assert_eq!(tx.hash_get::<u64>("catalog", "a").unwrap(), Some(7));
    assert_eq!(tx.var_get::<String>("default").unwrap().as_deref(), Some("d"));
    assert_eq!(engine.commit_seq(), 1);
}

#[test]
fn uncommitted_writes_are_not_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");

    {
        let engine = Engine::open(EngineConfig::file(&path)).unwrap();
        let mut tx = engine.begin().unwrap();
        tx.long_set("size", 10).unwrap();
        tx.rollback();
    }

    let engine = Engine::open(EngineConfig::file(&path)).unwrap();
    assert!(engine.structure_names().is_empty());
}

#[test]
fn plain_file_in_the_way_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    std::fs::write(&path, b"not a keyspace").unwrap();

    let err = Engine::open(EngineConfig::file(&path)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Io(_)));
}

#[test]
fn loaded_directory_matches_committed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    {
        let engine = Engine::open(EngineConfig::file(&path)).unwrap();
        let mut tx = engine.begin().unwrap();
        tx.long_set("a", 1).unwrap();
        tx.commit().unwrap();
    }

    let directory = DiskStore::open(&path).unwrap().load().unwrap();
    assert_eq!(directory.commit_seq, 1);
    assert!(directory.get("a").is_some());
}

#[test]
fn point_updates_to_a_large_map_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    {
        let engine = Engine::open(EngineConfig::file(&path)).unwrap();
        let mut tx = engine.begin().unwrap();
        for key in 0..20_000u64 {
            tx.tree_put("values", key, &7u32).unwrap();
        }
        tx.commit().unwrap();

        for key in (0..50u64).map(|i| i * 400) {
            let mut tx = engine.begin().unwrap();
            tx.tree_put("values", key, &(key as u32)).unwrap();
            tx.commit().unwrap();
        }
        let mut tx = engine.begin().unwrap();
        tx.tree_remove("values", 19_999).unwrap();
        tx.commit().unwrap();
    }

    let engine = Engine::open(EngineConfig::file(&path)).unwrap();
    assert_eq!(engine.commit_seq(), 52);
    let mut tx = engine.begin().unwrap();
    assert_eq!(tx.tree_len("values").unwrap(), 19_999);
    assert_eq!(tx.tree_get::<u32>("values", 400).unwrap(), Some(400));
    assert_eq!(tx.tree_get::<u32>("values", 401).unwrap(), Some(7));
    assert_eq!(tx.tree_get::<u32>("values", 19_999).unwrap(), None);
}

#[test]
fn delete_then_recreate_drops_old_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    {
        let engine = Engine::open(EngineConfig::file(&path)).unwrap();
        let mut tx = engine.begin().unwrap();
        tx.tree_put("values", 1, &1u8).unwrap();
        tx.tree_put("values", 2, &2u8).unwrap();
        tx.hash_put("names", "old", &0u8).unwrap();
        tx.commit().unwrap();

        let mut tx = engine.begin().unwrap();
        tx.delete("values");
        tx.tree_put("values", 3, &3u8).unwrap();
        tx.delete("names");
        tx.commit().unwrap();
    }

    let engine = Engine::open(EngineConfig::file(&path)).unwrap();
    let mut tx = engine.begin().unwrap();
    assert_eq!(tx.tree_keys("values", ..).unwrap(), vec![3]);
    assert!(!tx.exists("names"));
}
