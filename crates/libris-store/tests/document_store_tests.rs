// Document store behaviour that depends on the engine's locking, indexes and
// collection files

mod common;

use std::sync::Arc;
use std::thread;

use common::{book, user, SHORT_TIMEOUT};
use libris_core::model::{TokenScope, UserPermissions, BOOKS_READ, BOOKS_WRITE};
use libris_core::storage::{BackendKind, Collection, Deadline, Key, Record, Storage};
use libris_core::{LibrisError, Token};
use libris_store::{open_storage, DocumentStore, StoreConfig};
use tempfile::TempDir;

#[test]
fn test_concurrent_inserts_get_distinct_ids() {
    let store = Arc::new(DocumentStore::new(SHORT_TIMEOUT * 10));
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store
                    .insert(book(&format!("Book {}", i), &["x"]))
                    .unwrap()
                    .into_book()
                    .unwrap()
                    .id
            })
        })
        .collect();

    let mut ids: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=8).collect::<Vec<_>>());
}

#[test]
fn test_permission_insert_merges_codes() {
    let store = DocumentStore::new(SHORT_TIMEOUT);
    let owner = store
        .insert(user("Ann", "ann@example.com"))
        .unwrap()
        .into_user()
        .unwrap();

    store
        .insert(Record::Permissions(UserPermissions::new(owner.id, [BOOKS_READ])))
        .unwrap();
    let merged = store
        .insert(Record::Permissions(UserPermissions::new(
            owner.id,
            [BOOKS_READ, BOOKS_WRITE],
        )))
        .unwrap()
        .into_permissions()
        .unwrap();
    assert_eq!(merged.codes.codes(), &[BOOKS_READ, BOOKS_WRITE]);
}

#[test]
fn test_permissions_for_missing_user() {
    let store = DocumentStore::new(SHORT_TIMEOUT);
    let err = store
        .insert(Record::Permissions(UserPermissions::new(9, [BOOKS_READ])))
        .unwrap_err();
    assert_eq!(err, LibrisError::not_found("users", "id=9"));
}

#[test]
fn test_writer_blocked_past_deadline() {
    let store = DocumentStore::new(SHORT_TIMEOUT);
    let holder = Deadline::after(SHORT_TIMEOUT * 10);
    let _guard = store.engine().read("books", "holder", &holder).unwrap();

    // Readers share the lock, writers wait and give up
    assert!(store.get(Collection::Books, &Key::Id(1)).unwrap_err().is_not_found());
    let err = store.insert(book("Late", &["x"])).unwrap_err();
    assert!(matches!(err, LibrisError::Timeout { ref op, .. } if op == "insert"));
}

#[test]
fn test_records_survive_reopen() {
    let dir = TempDir::new().unwrap();

    let (inserted, owner) = {
        let store = DocumentStore::open(dir.path(), SHORT_TIMEOUT).unwrap();
        let inserted = store.insert(book("Dune", &["scifi"])).unwrap().into_book().unwrap();
        let owner = store
            .insert(user("Ann", "ann@example.com"))
            .unwrap()
            .into_user()
            .unwrap();
        store
            .insert(Record::Permissions(UserPermissions::new(owner.id, [BOOKS_READ])))
            .unwrap();
        store
            .insert(Record::Token(Token {
                plaintext: "".into(),
                hash: vec![7; 32],
                user_id: owner.id,
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
                scope: TokenScope::Authentication,
            }))
            .unwrap();
        (inserted, owner)
    };

    let store = DocumentStore::open(dir.path(), SHORT_TIMEOUT).unwrap();
    let fetched = store
        .get(Collection::Books, &Key::Id(inserted.id))
        .unwrap()
        .into_book()
        .unwrap();
    assert_eq!(fetched, inserted);
    assert_eq!(store.get_last_id(Collection::Books).unwrap(), inserted.id);

    let by_email = store
        .get(Collection::Users, &Key::Email("ann@example.com".into()))
        .unwrap()
        .into_user()
        .unwrap();
    assert_eq!(by_email.id, owner.id);

    let by_token = store
        .get(
            Collection::Tokens,
            &Key::Token {
                hash: vec![7; 32],
                scope: TokenScope::Authentication,
            },
        )
        .unwrap()
        .into_user()
        .unwrap();
    assert_eq!(by_token.id, owner.id);

    let perms = store
        .get(Collection::Permissions, &Key::UserId(owner.id))
        .unwrap()
        .into_permissions()
        .unwrap();
    assert!(perms.codes.include(BOOKS_READ));

    // Unique indexes are rebuilt from the file
    let err = store.insert(user("Other Ann", "ann@example.com")).unwrap_err();
    assert!(matches!(err, LibrisError::DuplicateKey { .. }));
}

#[test]
fn test_ids_not_reused_after_delete_and_reopen() {
    let dir = TempDir::new().unwrap();

    let first = {
        let store = DocumentStore::open(dir.path(), SHORT_TIMEOUT).unwrap();
        store.insert(book("A", &["x"])).unwrap();
        let second = store.insert(book("B", &["x"])).unwrap().into_book().unwrap();
        store.delete(Collection::Books, &Key::Id(second.id)).unwrap();
        second
    };

    let store = DocumentStore::open(dir.path(), SHORT_TIMEOUT).unwrap();
    let next = store.insert(book("C", &["x"])).unwrap().into_book().unwrap();
    assert!(next.id > first.id);
    assert!(store
        .get(Collection::Books, &Key::Id(first.id))
        .unwrap_err()
        .is_not_found());
}

#[test]
fn test_configured_document_directory_persists() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig {
        database_path: Some(dir.path().join("catalog")),
        ..StoreConfig::default()
    };

    {
        let storage = open_storage(&config).unwrap();
        assert_eq!(storage.backend(), BackendKind::Document);
        storage.insert(book("Dune", &["scifi"])).unwrap();
    }

    let reopened = open_storage(&config).unwrap();
    assert_eq!(reopened.get_last_id(Collection::Books).unwrap(), 1);
}
