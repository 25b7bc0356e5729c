// Lifecycle events emitted by the models and the authorizer

mod common;

use common::{backends, book};
use libris_core::logging_facility::init_test_capture;
use libris_engine::{Authorizer, Models};

#[test]
fn test_model_operations_emit_start_and_end() {
    let capture = init_test_capture();
    let (_, storage) = backends().remove(0);
    let models = Models::new(storage);

    let stored = models.books.insert(book("Logged", "Anon", &["misc"])).unwrap();
    capture.assert_event_exists("book_insert", "start");
    capture.assert_event_exists("book_insert", "end");

    let _ = models.books.get(stored.id + 100);
    capture.assert_error_code("book_get", "ERR_NOT_FOUND");

    let failed = capture.errors_for_op("book_get");
    assert_eq!(failed[0].err_kind(), Some("NotFound"));
    assert!(failed[0].duration_ms().is_some());
}

#[test]
fn test_authenticate_is_bracketed() {
    let capture = init_test_capture();
    let (_, storage) = backends().remove(0);
    let authorizer = Authorizer::new(storage);

    authorizer.authenticate(None).unwrap();
    capture.assert_event_exists("authenticate", "start");
    capture.assert_event_exists("authenticate", "end");

    let _ = authorizer.authenticate(Some("Bearer ABCDEFGHIJKLMNOPQRSTUVWXYZ"));
    capture.assert_error_code("authenticate", "ERR_UNAUTHORISED");
}
