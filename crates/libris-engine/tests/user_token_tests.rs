// User, token and permission models, checked against every backend

mod common;

use chrono::Duration;
use common::{for_each_backend, user};
use libris_core::credentials::hash_token_plaintext;
use libris_core::model::{TokenScope, User, BOOKS_READ, BOOKS_WRITE};
use libris_core::LibrisError;

#[test]
fn test_user_insert_and_lookup_by_email() {
    for_each_backend(|backend, models| {
        let stored = models
            .users
            .insert(user("Ann", "ann@example.com", "pa55word!"))
            .unwrap();
        assert!(!stored.activated, "{backend}");

        let fetched = models.users.get_by_email("ann@example.com").unwrap();
        assert_eq!(fetched.id, stored.id, "{backend}");
        assert!(fetched.password.matches("pa55word!").unwrap(), "{backend}");
        assert!(!fetched.password.matches("wrong-password").unwrap(), "{backend}");
        assert_eq!(models.users.get(stored.id).unwrap().email, "ann@example.com");
    });
}

#[test]
fn test_duplicate_email_is_distinct_from_edit_conflict() {
    for_each_backend(|backend, models| {
        models
            .users
            .insert(user("Ann", "ann@example.com", "pa55word!"))
            .unwrap();
        let err = models
            .users
            .insert(user("Imposter", "ann@example.com", "pa55word!"))
            .unwrap_err();
        assert_eq!(
            err,
            LibrisError::DuplicateKey {
                collection: "users".to_string(),
                field: "email".to_string()
            },
            "{backend}"
        );
        assert!(err.kind().is_conflict());
    });
}

#[test]
fn test_email_lookup_is_case_sensitive() {
    for_each_backend(|backend, models| {
        models
            .users
            .insert(user("Ann", "ann@example.com", "pa55word!"))
            .unwrap();
        let err = models.users.get_by_email("ANN@example.com").unwrap_err();
        assert!(err.is_not_found(), "{backend}");
    });
}

#[test]
fn test_activation_update_bumps_version() {
    for_each_backend(|backend, models| {
        let mut stored = models
            .users
            .insert(user("Ann", "ann@example.com", "pa55word!"))
            .unwrap();
        let before = stored.version;
        stored.activated = true;

        let updated = models.users.update(stored.clone()).unwrap();
        assert!(updated.activated, "{backend}");
        assert_ne!(updated.version, before, "{backend}");
        assert!(models.users.get(updated.id).unwrap().activated, "{backend}");

        // The copy still carries the old version
        assert!(matches!(
            models.users.update(stored),
            Err(LibrisError::EditConflict { .. })
        ));
    });
}

#[test]
#[should_panic(expected = "missing password hash for user")]
fn test_user_without_hash_aborts() {
    for_each_backend(|_, models| {
        let _ = models.users.insert(User::new("Ann", "ann@example.com"));
    });
}

#[test]
fn test_token_round_trip() {
    for_each_backend(|backend, models| {
        let owner = models
            .users
            .insert(user("Ann", "ann@example.com", "pa55word!"))
            .unwrap();
        let token = models
            .tokens
            .new_token(owner.id, Duration::days(3), TokenScope::Activation)
            .unwrap();
        assert_eq!(token.plaintext.expose().len(), 26, "{backend}");
        assert_eq!(token.hash, hash_token_plaintext(token.plaintext.expose()));

        let resolved = models
            .users
            .get_for_token(TokenScope::Activation, token.plaintext.expose())
            .unwrap();
        assert_eq!(resolved.id, owner.id, "{backend}");

        // Same plaintext, other scope
        let err = models
            .users
            .get_for_token(TokenScope::Authentication, token.plaintext.expose())
            .unwrap_err();
        assert!(err.is_not_found(), "{backend}");

        let err = models
            .users
            .get_for_token(TokenScope::Activation, "AAAAAAAAAAAAAAAAAAAAAAAAAA")
            .unwrap_err();
        assert!(err.is_not_found(), "{backend}");
    });
}

#[test]
fn test_expired_token_does_not_resolve() {
    for_each_backend(|backend, models| {
        let owner = models
            .users
            .insert(user("Ann", "ann@example.com", "pa55word!"))
            .unwrap();
        let token = models
            .tokens
            .new_token(owner.id, Duration::seconds(-1), TokenScope::Authentication)
            .unwrap();
        let err = models
            .users
            .get_for_token(TokenScope::Authentication, token.plaintext.expose())
            .unwrap_err();
        assert!(err.is_not_found(), "{backend}");
    });
}

#[test]
fn test_delete_all_for_user_revokes_scope_only() {
    for_each_backend(|backend, models| {
        let owner = models
            .users
            .insert(user("Ann", "ann@example.com", "pa55word!"))
            .unwrap();
        let activation = models
            .tokens
            .new_token(owner.id, Duration::days(1), TokenScope::Activation)
            .unwrap();
        let sessions: Vec<_> = (0..2)
            .map(|_| {
                models
                    .tokens
                    .new_token(owner.id, Duration::days(1), TokenScope::Authentication)
                    .unwrap()
            })
            .collect();

        models
            .tokens
            .delete_all_for_user(TokenScope::Authentication, owner.id)
            .unwrap();
        for session in &sessions {
            let err = models
                .users
                .get_for_token(TokenScope::Authentication, session.plaintext.expose())
                .unwrap_err();
            assert!(err.is_not_found(), "{backend}");
        }
        assert!(models
            .users
            .get_for_token(TokenScope::Activation, activation.plaintext.expose())
            .is_ok());

        // Nothing left to revoke is fine
        models
            .tokens
            .delete_all_for_user(TokenScope::Authentication, owner.id)
            .unwrap();
    });
}

#[test]
fn test_token_for_unknown_user_rejected() {
    for_each_backend(|backend, models| {
        let err = models
            .tokens
            .new_token(404, Duration::days(1), TokenScope::Activation)
            .unwrap_err();
        assert!(err.is_not_found(), "{backend}");
    });
}

#[test]
fn test_permissions_accumulate_without_duplicates() {
    for_each_backend(|backend, models| {
        let owner = models
            .users
            .insert(user("Ann", "ann@example.com", "pa55word!"))
            .unwrap();
        assert!(models
            .permissions
            .get_all_for_user(owner.id)
            .unwrap()
            .is_empty());

        models.permissions.add_for_user(owner.id, &[BOOKS_READ]).unwrap();
        let codes = models
            .permissions
            .add_for_user(owner.id, &[BOOKS_READ, BOOKS_WRITE])
            .unwrap();
        assert_eq!(codes.codes(), &[BOOKS_READ, BOOKS_WRITE], "{backend}");

        let stored = models.permissions.get_all_for_user(owner.id).unwrap();
        assert!(stored.include(BOOKS_WRITE), "{backend}");
        assert_eq!(stored.codes().len(), 2, "{backend}");
    });
}
