//! Property tests over the public API

use std::sync::Arc;

use proptest::prelude::*;
use tabula_engine::Engine;
use tabula_storage::{SparseArray, StorageManager};

fn array(name: &str) -> SparseArray<i64> {
    StorageManager::new(Arc::new(Engine::in_memory()))
        .unwrap()
        .create_storage("p")
        .unwrap()
        .create_array(name)
        .unwrap()
}

proptest! {
    #[test]
    fn copy_round_trip_preserves_order(
        values in prop::collection::vec(any::<Option<i64>>(), 0..60),
        batch in 1u64..16,
    ) {
        let source = array("source");
        source.copy_from_values(values.clone(), false, batch).unwrap();
        prop_assert_eq!(source.size().unwrap(), values.len() as u64);

        let mut out = Vec::new();
        source.copy_to_vec(&mut out, false, batch).unwrap();
        prop_assert_eq!(out, values);
    }

    #[test]
    fn resize_sets_size_and_truncates(
        initial in 0u64..40,
        shrink in 0u64..40,
        grow in 0u64..40,
    ) {
        let a = array("a");
        a.append_values(initial, 1).unwrap();
        a.resize(shrink).unwrap();
        prop_assert_eq!(a.size().unwrap(), shrink);
        a.resize(shrink + grow).unwrap();

        let values = a.get_values(0, shrink + grow).unwrap();
        let kept = initial.min(shrink);
        for (index, value) in (0u64..).zip(values) {
            let expected = if index < kept { Some(1) } else { None };
            prop_assert_eq!(value, expected);
        }
    }

    #[test]
    fn set_then_get_round_trips(size in 1u64..30, index in 0u64..30, value in any::<Option<i64>>()) {
        let a = array("a");
        a.resize(size).unwrap();
        a.set_default_value(-1).unwrap();
        let result = a.set_value(index, value);
        if index < size {
            result.unwrap();
            prop_assert_eq!(a.get_value(index).unwrap(), Some(value.unwrap_or(-1)));
        } else {
            prop_assert!(result.is_err());
        }
    }
}
