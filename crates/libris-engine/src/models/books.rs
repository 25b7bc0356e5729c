//! Book model

use std::sync::Arc;

use libris_core::errors::{LibrisError, Result};
use libris_core::model::{validate_book, Book};
use libris_core::query::{Filters, ListQuery, Metadata};
use libris_core::rules::Validator;
use libris_core::storage::{Collection, Key, Record, Storage};

use super::observe;

#[derive(Clone)]
pub struct BookModel {
    storage: Arc<dyn Storage>,
}

impl BookModel {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Validate and persist a new book
    ///
    /// # Errors
    /// `Validation` listing every violated rule, or any storage error.
    pub fn insert(&self, book: Book) -> Result<Book> {
        observe("book_insert", || {
            let mut v = Validator::new();
            validate_book(&mut v, &book);
            v.finish()?;
            self.storage.insert(Record::Book(book))?.into_book()
        })
    }

    /// # Errors
    /// `RecordNotFound` for ids below 1 or absent books.
    pub fn get(&self, id: i64) -> Result<Book> {
        observe("book_get", || {
            if id < 1 {
                return Err(LibrisError::not_found(
                    Collection::Books.name(),
                    Key::Id(id).to_string(),
                ));
            }
            self.storage.get(Collection::Books, &Key::Id(id))?.into_book()
        })
    }

    /// List books whose title and author contain the given text and whose
    /// genres include every one of `genres`
    ///
    /// Empty `title`/`author` match everything.
    ///
    /// # Errors
    /// `Validation` for bad paging or sort parameters.
    pub fn get_all(
        &self,
        title: &str,
        author: &str,
        genres: &[String],
        filters: &Filters,
    ) -> Result<(Vec<Book>, Metadata)> {
        observe("book_get_all", || {
            let query = ListQuery::new(filters.plan()?)
                .with_text("title", title)
                .with_text("author", author)
                .with_tags(genres.to_vec());
            let page = self.storage.get_all(Collection::Books, &query)?;
            let books = page
                .records
                .into_iter()
                .map(Record::into_book)
                .collect::<Result<Vec<_>>>()?;
            Ok((books, page.metadata))
        })
    }

    /// Validate and write back a loaded book
    ///
    /// # Errors
    /// `EditConflict` if the book changed since it was read.
    pub fn update(&self, book: Book) -> Result<Book> {
        observe("book_update", || {
            let mut v = Validator::new();
            validate_book(&mut v, &book);
            v.finish()?;
            self.storage.update(Record::Book(book))?.into_book()
        })
    }

    /// # Errors
    /// `RecordNotFound` for ids below 1 or absent books.
    pub fn delete(&self, id: i64) -> Result<()> {
        observe("book_delete", || {
            if id < 1 {
                return Err(LibrisError::not_found(
                    Collection::Books.name(),
                    Key::Id(id).to_string(),
                ));
            }
            self.storage.delete(Collection::Books, &Key::Id(id)).map(|_| ())
        })
    }

    /// Highest book id, `None` while the catalog is empty
    ///
    /// # Errors
    /// Storage errors other than an empty collection.
    pub fn last_id(&self) -> Result<Option<i64>> {
        observe("book_last_id", || {
            match self.storage.get_last_id(Collection::Books) {
                Ok(id) => Ok(Some(id)),
                Err(e) if e.is_not_found() => Ok(None),
                Err(e) => Err(e),
            }
        })
    }
}
