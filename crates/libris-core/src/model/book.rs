use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::rules::validation::{unique, Validator};

/// Columns a book listing may be sorted by, with `-` marking descending order
pub const BOOK_SORT_SAFELIST: &[&str] = &[
    "id", "title", "author", "year", "size", "-id", "-title", "-author", "-year", "-size",
];

/// Fields a book listing may apply a text filter to
pub const BOOK_TEXT_FIELDS: &[&str] = &["title", "author"];

/// Earliest accepted publication year
pub const MIN_BOOK_YEAR: i32 = 1888;

/// Page count, rendered externally as `"<n> pages"`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Size(pub i32);

impl Size {
    pub fn pages(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} pages", self.0)
    }
}

impl Serialize for Size {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct SizeVisitor;

impl Visitor<'_> for SizeVisitor {
    type Value = Size;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(r#"a string of the form "<n> pages""#)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Size, E> {
        let invalid = || E::custom("invalid size format");
        let mut parts = value.split(' ');
        let (Some(count), Some("pages"), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };
        count.parse::<i32>().map(Size).map_err(|_| invalid())
    }
}

impl<'de> Deserialize<'de> for Size {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(SizeVisitor)
    }
}

/// Book record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Backend-assigned identifier, 0 until inserted
    pub id: i64,

    #[serde(skip)]
    pub created_at: DateTime<Utc>,

    pub title: String,
    pub author: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub year: i32,

    pub size: Size,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,

    /// Optimistic-concurrency token, regenerated on every successful write
    pub version: Uuid,
}

fn is_zero(year: &i32) -> bool {
    *year == 0
}

impl Book {
    /// Build an unsaved book; id, timestamp and version are set by the store
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        year: i32,
        size: Size,
        genres: Vec<String>,
    ) -> Self {
        Self {
            id: 0,
            created_at: DateTime::<Utc>::default(),
            title: title.into(),
            author: author.into(),
            year,
            size,
            genres,
            version: Uuid::nil(),
        }
    }
}

/// Record every violated book invariant in `v`
pub fn validate_book(v: &mut Validator, book: &Book) {
    v.check(!book.title.is_empty(), "title", "must be provided");
    v.check(
        book.title.len() <= 500,
        "title",
        "must not be more than 500 bytes long",
    );

    v.check(!book.author.is_empty(), "author", "must be provided");
    v.check(
        book.author.len() <= 500,
        "author",
        "must not be more than 500 bytes long",
    );

    v.check(book.year != 0, "year", "must be provided");
    v.check(
        book.year >= MIN_BOOK_YEAR,
        "year",
        "must be greater than 1888",
    );
    v.check(
        book.year <= Utc::now().year(),
        "year",
        "must not be in the future",
    );

    v.check(book.size.0 != 0, "size", "must be provided");
    v.check(book.size.0 > 0, "size", "must be a positive integer");

    v.check(
        !book.genres.is_empty(),
        "genres",
        "must contain at least 1 genre",
    );
    v.check(
        book.genres.len() <= 5,
        "genres",
        "must not contain more than 5 genres",
    );
    v.check(
        unique(&book.genres),
        "genres",
        "must not contain duplicate values",
    );
}
