//! Storage interface
//!
//! One contract for every backend. Each entity kind is a closed variant of
//! [`Collection`] and [`Record`], so adapters dispatch with a `match` instead
//! of inspecting payload types.

pub mod deadline;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{LibrisError, Result};
use crate::model::{Book, Token, TokenScope, User, UserPermissions};
use crate::query::{ListQuery, Metadata};

pub use deadline::Deadline;

/// Backend implementation selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Embedded schemaless document engine
    Document,
    /// Relational store on SQLite
    Sqlite,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Document => "document",
            BackendKind::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical entity kind a storage operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Books,
    Users,
    Tokens,
    Permissions,
}

impl Collection {
    /// Name of the backing collection or table
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Books => "books",
            Collection::Users => "users",
            Collection::Tokens => "tokens",
            Collection::Permissions => "users_permissions",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value of one entity kind
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Book(Book),
    User(User),
    Token(Token),
    Permissions(UserPermissions),
}

impl Record {
    pub fn collection(&self) -> Collection {
        match self {
            Record::Book(_) => Collection::Books,
            Record::User(_) => Collection::Users,
            Record::Token(_) => Collection::Tokens,
            Record::Permissions(_) => Collection::Permissions,
        }
    }

    fn mismatch(self, expected: Collection) -> LibrisError {
        LibrisError::Internal {
            message: format!(
                "expected a {} record, storage returned {}",
                expected,
                self.collection()
            ),
        }
    }

    /// # Errors
    /// Returns `LibrisError::Internal` if this is not a book.
    pub fn into_book(self) -> Result<Book> {
        match self {
            Record::Book(book) => Ok(book),
            other => Err(other.mismatch(Collection::Books)),
        }
    }

    /// # Errors
    /// Returns `LibrisError::Internal` if this is not a user.
    pub fn into_user(self) -> Result<User> {
        match self {
            Record::User(user) => Ok(user),
            other => Err(other.mismatch(Collection::Users)),
        }
    }

    /// # Errors
    /// Returns `LibrisError::Internal` if this is not a token.
    pub fn into_token(self) -> Result<Token> {
        match self {
            Record::Token(token) => Ok(token),
            other => Err(other.mismatch(Collection::Tokens)),
        }
    }

    /// # Errors
    /// Returns `LibrisError::Internal` if this is not a permission set.
    pub fn into_permissions(self) -> Result<UserPermissions> {
        match self {
            Record::Permissions(perms) => Ok(perms),
            other => Err(other.mismatch(Collection::Permissions)),
        }
    }
}

/// How a record is addressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// Primary id of a book or user
    Id(i64),
    /// Alternate user key
    Email(String),
    /// Token hash plus the scope it was issued for
    Token { hash: Vec<u8>, scope: TokenScope },
    /// Every token one user holds in one scope
    UserScope { user_id: i64, scope: TokenScope },
    /// Permission set of one user
    UserId(i64),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Id(id) => write!(f, "id={}", id),
            Key::Email(email) => write!(f, "email={}", email),
            // Hashes are not secret, but nothing downstream needs them
            Key::Token { scope, .. } => write!(f, "token(scope={})", scope),
            Key::UserScope { user_id, scope } => {
                write!(f, "user_id={},scope={}", user_id, scope)
            }
            Key::UserId(user_id) => write!(f, "user_id={}", user_id),
        }
    }
}

/// One page of a list query
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    pub metadata: Metadata,
}

impl Page {
    /// Empty result with all-zero metadata
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            metadata: Metadata::default(),
        }
    }
}

/// Persistence contract implemented by every backend
///
/// Implementations are shared across request workers and must bound every
/// call by their configured deadline, surfacing expiry as
/// `LibrisError::Timeout`.
pub trait Storage: Send + Sync {
    fn backend(&self) -> BackendKind;

    /// Persist a new record
    ///
    /// Books and users receive a fresh id from a backend-native sequence,
    /// a creation timestamp and a version. Permission inserts add codes to
    /// the user's existing set; codes already held are ignored.
    ///
    /// # Errors
    /// `DuplicateKey` when a uniqueness constraint rejects the write.
    fn insert(&self, record: Record) -> Result<Record>;

    /// Fetch one record
    ///
    /// `get(Tokens, Key::Token{..})` resolves the owning user and returns
    /// `Record::User`, and only while the token is unexpired.
    /// `get(Permissions, Key::UserId)` returns a possibly empty set.
    ///
    /// # Errors
    /// `RecordNotFound` when nothing matches; `Unsupported` for a key the
    /// collection cannot be addressed by.
    fn get(&self, collection: Collection, key: &Key) -> Result<Record>;

    /// Filtered, sorted, paginated listing
    ///
    /// # Errors
    /// `Unsupported` for collections without a listing or unknown filter fields.
    fn get_all(&self, collection: Collection, query: &ListQuery) -> Result<Page>;

    /// Compare-and-set on `(id, version)`; returns the record with a fresh version
    ///
    /// # Errors
    /// `EditConflict` when the stored version differs or the record is gone.
    fn update(&self, record: Record) -> Result<Record>;

    /// Remove matching records, returning how many went
    ///
    /// # Errors
    /// `RecordNotFound` if zero records matched.
    fn delete(&self, collection: Collection, key: &Key) -> Result<u64>;

    /// Highest id in an id-bearing collection
    ///
    /// # Errors
    /// `RecordNotFound` when the collection is empty.
    fn get_last_id(&self, collection: Collection) -> Result<i64>;
}
