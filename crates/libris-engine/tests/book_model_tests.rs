// Book model behaviour, checked against every backend

mod common;

use std::collections::HashSet;

use common::{book, for_each_backend};
use libris_core::model::{Book, Size, BOOK_SORT_SAFELIST};
use libris_core::query::{Filters, Metadata};
use libris_core::LibrisError;
use libris_engine::Models;

fn filters(page: i64, page_size: i64, sort: &str) -> Filters {
    Filters::new(page, page_size, sort, BOOK_SORT_SAFELIST)
}

fn titles(books: &[Book]) -> Vec<String> {
    books.iter().map(|b| b.title.clone()).collect()
}

fn seed(models: &Models) {
    for (title, author, genres) in [
        ("It", "Stephen King", &["horror", "classic"][..]),
        ("Fit for Life", "Harvey Diamond", &["health"][..]),
        ("kit and kaboodle", "Ann Other", &["horror"][..]),
        ("The Cat in the Hat", "Dr. Seuss", &["children", "classic"][..]),
        ("Dracula", "Bram Stoker", &["horror", "classic", "gothic"][..]),
    ] {
        models.books.insert(book(title, author, genres)).unwrap();
    }
}

#[test]
fn test_insert_then_get_returns_same_fields() {
    for_each_backend(|backend, models| {
        let input = book("Dune", "Frank Herbert", &["scifi", "classic"]);
        let stored = models.books.insert(input.clone()).unwrap();
        assert!(stored.id >= 1, "{backend}");
        assert!(!stored.version.is_nil(), "{backend}");

        let fetched = models.books.get(stored.id).unwrap();
        assert_eq!(fetched, stored, "{backend}");
        assert_eq!(
            (&fetched.title, &fetched.author, fetched.year, fetched.size, &fetched.genres),
            (&input.title, &input.author, input.year, input.size, &input.genres),
            "{backend}"
        );
    });
}

#[test]
fn test_invalid_book_collects_every_violation() {
    for_each_backend(|backend, models| {
        let bad = Book::new("", "", 1500, Size(0), vec![]);
        let err = models.books.insert(bad).unwrap_err();
        let LibrisError::Validation { errors } = err else {
            panic!("{backend}: expected validation error");
        };
        let fields: HashSet<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        for field in ["title", "author", "year", "size", "genres"] {
            assert!(fields.contains(field), "{backend}: missing {field}");
        }
        assert_eq!(models.books.last_id().unwrap(), None, "{backend}");
    });
}

#[test]
fn test_stale_version_is_edit_conflict() {
    for_each_backend(|backend, models| {
        let stored = models.books.insert(book("Emma", "Jane Austen", &["classic"])).unwrap();

        let mut first = stored.clone();
        first.title = "Emma (annotated)".to_string();
        let updated = models.books.update(first).unwrap();
        assert_ne!(updated.version, stored.version, "{backend}");

        let mut second = stored.clone();
        second.year = 1816;
        let err = models.books.update(second).unwrap_err();
        assert_eq!(
            err,
            LibrisError::EditConflict {
                collection: "books".to_string(),
                id: stored.id
            },
            "{backend}"
        );
        assert_eq!(models.books.get(stored.id).unwrap().title, "Emma (annotated)");
    });
}

#[test]
fn test_concurrent_updates_only_one_wins() {
    for_each_backend(|backend, models| {
        let stored = models.books.insert(book("Persuasion", "Jane Austen", &["classic"])).unwrap();

        let outcomes: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|i| {
                    let model = models.books.clone();
                    let mut copy = stored.clone();
                    copy.title = format!("Persuasion v{}", i);
                    s.spawn(move || model.update(copy))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let wins = outcomes.iter().filter(|r| r.is_ok()).count();
        let conflicts = outcomes
            .iter()
            .filter(|r| matches!(r, Err(LibrisError::EditConflict { .. })))
            .count();
        assert_eq!((wins, conflicts), (1, 1), "{backend}");
    });
}

#[test]
fn test_title_filter_is_case_insensitive_substring() {
    for_each_backend(|backend, models| {
        seed(&models);
        let (books, meta) = models
            .books
            .get_all("it", "", &[], &filters(1, 20, "id"))
            .unwrap();
        assert_eq!(
            titles(&books),
            vec!["It", "Fit for Life", "kit and kaboodle"],
            "{backend}"
        );
        assert_eq!(meta.total_records, 3, "{backend}");

        models
            .books
            .insert(book("Éclair Stories", "Anon", &["food"]))
            .unwrap();
        models
            .books
            .insert(book("Eclairs at Dawn", "Anon", &["food"]))
            .unwrap();
        let (books, _) = models
            .books
            .get_all("éCLAIR", "", &[], &filters(1, 20, "id"))
            .unwrap();
        assert_eq!(titles(&books), vec!["Éclair Stories"], "{backend}");
    });
}

#[test]
fn test_genre_filter_requires_superset() {
    for_each_backend(|backend, models| {
        seed(&models);
        let tags = vec!["horror".to_string(), "classic".to_string()];
        let (books, _) = models
            .books
            .get_all("", "", &tags, &filters(1, 20, "title"))
            .unwrap();
        assert_eq!(titles(&books), vec!["Dracula", "It"], "{backend}");
    });
}

#[test]
fn test_filters_combine_with_and() {
    for_each_backend(|backend, models| {
        seed(&models);
        let tags = vec!["horror".to_string()];
        let (books, _) = models
            .books
            .get_all("it", "king", &tags, &filters(1, 20, "id"))
            .unwrap();
        assert_eq!(titles(&books), vec!["It"], "{backend}");
    });
}

#[test]
fn test_wildcards_in_filter_are_literal() {
    for_each_backend(|backend, models| {
        seed(&models);
        models.books.insert(book("100% Cotton", "A_B", &["misc"])).unwrap();

        let (hits, _) = models.books.get_all("%", "", &[], &filters(1, 20, "id")).unwrap();
        assert_eq!(titles(&hits), vec!["100% Cotton"], "{backend}");
        let (hits, _) = models.books.get_all("", "_", &[], &filters(1, 20, "id")).unwrap();
        assert_eq!(titles(&hits), vec!["100% Cotton"], "{backend}");
    });
}

#[test]
fn test_pages_cover_every_record_once() {
    for_each_backend(|backend, models| {
        for i in 0..23 {
            // Repeated years force ties on the sort column
            let mut b = book(&format!("Volume {:02}", i), "Series Author", &["series"]);
            b.year = 1990 + (i % 3);
            models.books.insert(b).unwrap();
        }

        let mut seen = Vec::new();
        let mut page = 1;
        loop {
            let (books, meta) = models
                .books
                .get_all("", "", &[], &filters(page, 5, "-year"))
                .unwrap();
            assert_eq!(meta.last_page, 5, "{backend}");
            assert_eq!(meta.total_records, 23, "{backend}");
            seen.extend(books.iter().map(|b| b.id));
            if page == meta.last_page as i64 {
                break;
            }
            page += 1;
        }

        let unique: HashSet<i64> = seen.iter().copied().collect();
        assert_eq!(seen.len(), 23, "{backend}");
        assert_eq!(unique.len(), 23, "{backend}");
    });
}

#[test]
fn test_empty_result_has_zero_metadata() {
    for_each_backend(|backend, models| {
        seed(&models);
        let (books, meta) = models
            .books
            .get_all("no such title", "", &[], &filters(1, 20, "id"))
            .unwrap();
        assert!(books.is_empty(), "{backend}");
        assert_eq!(meta, Metadata::default(), "{backend}");
    });
}

#[test]
fn test_unlisted_sort_rejected_before_storage() {
    for_each_backend(|backend, models| {
        let err = models
            .books
            .get_all("", "", &[], &filters(1, 20, "password"))
            .unwrap_err();
        let LibrisError::Validation { errors } = err else {
            panic!("{backend}: expected validation error");
        };
        assert_eq!(errors[0].field, "sort", "{backend}");
        assert_eq!(errors[0].message, "invalid sort value", "{backend}");
    });
}

#[test]
fn test_delete_then_get_is_not_found() {
    for_each_backend(|backend, models| {
        let stored = models.books.insert(book("Ephemeral", "Anon", &["misc"])).unwrap();
        models.books.delete(stored.id).unwrap();

        assert!(models.books.get(stored.id).unwrap_err().is_not_found(), "{backend}");
        assert!(models.books.delete(stored.id).unwrap_err().is_not_found(), "{backend}");
        assert!(models.books.delete(0).unwrap_err().is_not_found(), "{backend}");
        assert!(models.books.get(-4).unwrap_err().is_not_found(), "{backend}");
    });
}

#[test]
fn test_last_id_tracks_inserts() {
    for_each_backend(|backend, models| {
        assert_eq!(models.books.last_id().unwrap(), None, "{backend}");
        let a = models.books.insert(book("A", "X", &["a"])).unwrap();
        let b = models.books.insert(book("B", "X", &["a"])).unwrap();
        assert!(b.id > a.id, "{backend}");
        assert_eq!(models.books.last_id().unwrap(), Some(b.id), "{backend}");
    });
}
