//! Error type tests

use std::error::Error as _;

use tabula_foundation::{Error, ErrorContext, ErrorKind};

#[test]
fn context_is_rendered_when_present() {
    let context = ErrorContext::new()
        .with_collection("weights")
        .with_operation("set_value");
    assert_eq!(context.to_string(), "in set_value on weights");

    let err = Error::index_out_of_range(9, 4).with_context(context);
    assert!(matches!(err.kind, ErrorKind::IndexOutOfRange { index: 9, bound: 4 }));
    assert_eq!(err.context.unwrap().operation, Some("set_value"));
}

#[test]
fn exhaustion_exposes_its_cause_as_source() {
    let err = Error::transaction_exhausted(3, Some(Error::null_value()));
    let source = err.kind.source().unwrap();
    assert!(source.to_string().contains("absent"));
}

#[test]
fn conflicts_are_recognized() {
    assert!(Error::conflict("st_storages").is_conflict());
    assert!(!Error::invalid_range(3, 1).is_conflict());
}

#[test]
fn messages_name_the_problem() {
    let cases = [
        (Error::invalid_argument("empty name"), "empty name"),
        (Error::invalid_range(5, 2), "start 5"),
        (Error::not_implemented("dictionaries"), "dictionaries"),
        (
            Error::structure_kind("size", "tree map", "atomic long"),
            "atomic long",
        ),
    ];
    for (err, needle) in cases {
        assert!(err.to_string().contains(needle), "{err} lacks {needle}");
    }
}
