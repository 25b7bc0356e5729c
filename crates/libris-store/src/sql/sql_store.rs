//! Relational adapter on SQLite
//!
//! One connection behind a mutex. Every call takes the lock with a timeout
//! derived from its deadline and installs a progress handler that interrupts
//! the running statement once the deadline passes, so both lock waits and
//! slow statements surface as `Timeout`.

#![allow(clippy::result_large_err)]

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use libris_core::clock::{from_millis, now_millis};
use libris_core::errors::LibrisError;
use libris_core::model::{
    Book, Password, Permissions, Size, User, UserPermissions, BOOK_SORT_SAFELIST, BOOK_TEXT_FIELDS,
};
use libris_core::query::ListQuery;
use libris_core::storage::{BackendKind, Collection, Deadline, Key, Page, Record, Storage};
use parking_lot::Mutex;
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db;
use crate::errors::{is_foreign_key_violation, lock_timeout, sqlite_error, Result};
use crate::migrations::apply_migrations;

/// VM instructions between deadline checks
const PROGRESS_INTERVAL: i32 = 1_000;

const BOOK_COLUMNS: &str = "id, created_at, title, author, year, size, genres, version";
const USER_COLUMNS: &str =
    "users.id, users.created_at, users.name, users.email, users.password_hash, users.activated, users.version";

fn conversion_failure<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn version_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_failure(idx, e))
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    let genres: String = row.get(6)?;
    Ok(Book {
        id: row.get(0)?,
        created_at: from_millis(row.get(1)?),
        title: row.get(2)?,
        author: row.get(3)?,
        year: row.get(4)?,
        size: Size(row.get(5)?),
        genres: serde_json::from_str(&genres).map_err(|e| conversion_failure(6, e))?,
        version: version_at(row, 7)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        created_at: from_millis(row.get(1)?),
        name: row.get(2)?,
        email: row.get(3)?,
        password: Password::from_hash(row.get(4)?),
        activated: row.get(5)?,
        version: version_at(row, 6)?,
    })
}

fn missing_user(user_id: i64) -> LibrisError {
    LibrisError::not_found(Collection::Users.name(), Key::Id(user_id).to_string())
}

/// Storage backed by a SQLite database
#[derive(Debug)]
pub struct SqlStore {
    conn: Mutex<Connection>,
    op_timeout: Duration,
}

impl SqlStore {
    /// Open (creating if needed) the database file and bring its schema up to date
    ///
    /// # Errors
    /// Returns `Persistence` if the file cannot be opened or a migration fails.
    pub fn open<P: AsRef<Path>>(path: P, op_timeout: Duration) -> Result<Self> {
        Self::from_connection(db::open(path)?, op_timeout)
    }

    /// Private in-memory database, mainly for tests
    ///
    /// # Errors
    /// Returns `Persistence` if configuration or migration fails.
    pub fn open_in_memory(op_timeout: Duration) -> Result<Self> {
        Self::from_connection(db::open_in_memory()?, op_timeout)
    }

    fn from_connection(mut conn: Connection, op_timeout: Duration) -> Result<Self> {
        db::configure(&conn, op_timeout)?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            op_timeout,
        })
    }

    /// The connection mutex, for callers that need to hold it directly
    pub fn connection(&self) -> &Mutex<Connection> {
        &self.conn
    }

    /// Run `f` on the connection under a fresh deadline
    fn with_conn<T>(
        &self,
        op: &str,
        f: impl FnOnce(&mut Connection, &Deadline) -> Result<T>,
    ) -> Result<T> {
        let deadline = Deadline::after(self.op_timeout);
        let mut conn = self
            .conn
            .try_lock_for(deadline.remaining())
            .ok_or_else(|| lock_timeout(op, "sqlite", &deadline))?;

        // Busy waits never call the progress handler
        conn.busy_timeout(deadline.remaining())
            .map_err(sqlite_error(op, &deadline))?;
        let watchdog = deadline;
        conn.progress_handler(PROGRESS_INTERVAL, Some(move || watchdog.expired()));
        let result = f(&mut conn, &deadline);
        conn.progress_handler(PROGRESS_INTERVAL, None::<fn() -> bool>);
        result
    }

    fn unsupported(op: &str, collection: Collection) -> LibrisError {
        LibrisError::Unsupported {
            op: op.to_string(),
            collection: collection.name().to_string(),
        }
    }

    fn insert_book(conn: &Connection, deadline: &Deadline, mut book: Book) -> Result<Record> {
        let op = "insert";
        book.created_at = now_millis();
        book.version = Uuid::new_v4();
        let genres = serde_json::to_string(&book.genres)?;
        book.id = conn
            .query_row(
                "INSERT INTO books (created_at, title, author, year, size, genres, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 RETURNING id",
                params![
                    book.created_at.timestamp_millis(),
                    book.title,
                    book.author,
                    book.year,
                    book.size.pages(),
                    genres,
                    book.version.to_string(),
                ],
                |row| row.get(0),
            )
            .map_err(sqlite_error(op, deadline))?;
        Ok(Record::Book(book))
    }

    fn insert_user(conn: &Connection, deadline: &Deadline, mut user: User) -> Result<Record> {
        let op = "insert";
        user.created_at = now_millis();
        user.version = Uuid::new_v4();
        let hash = user.password.persisted_hash().to_vec();
        user.id = conn
            .query_row(
                "INSERT INTO users (created_at, name, email, password_hash, activated, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 RETURNING id",
                params![
                    user.created_at.timestamp_millis(),
                    user.name,
                    user.email,
                    hash,
                    user.activated,
                    user.version.to_string(),
                ],
                |row| row.get(0),
            )
            .map_err(sqlite_error(op, deadline))?;
        Ok(Record::User(user))
    }

    fn insert_permissions(
        conn: &mut Connection,
        deadline: &Deadline,
        perms: UserPermissions,
    ) -> Result<Record> {
        let op = "insert";
        let user_id = perms.user_id;
        let tx = conn.transaction().map_err(sqlite_error(op, deadline))?;

        let exists = tx
            .query_row("SELECT 1 FROM users WHERE id = ?1", [user_id], |_| Ok(()))
            .optional()
            .map_err(sqlite_error(op, deadline))?;
        if exists.is_none() {
            return Err(missing_user(user_id));
        }

        {
            let mut stmt = tx
                .prepare("INSERT OR IGNORE INTO users_permissions (user_id, code) VALUES (?1, ?2)")
                .map_err(sqlite_error(op, deadline))?;
            for code in perms.codes.codes() {
                stmt.execute(params![user_id, code])
                    .map_err(sqlite_error(op, deadline))?;
            }
        }
        let merged = Self::permission_codes(&tx, deadline, user_id)?;
        tx.commit().map_err(sqlite_error(op, deadline))?;

        Ok(Record::Permissions(UserPermissions {
            user_id,
            codes: merged,
        }))
    }

    fn permission_codes(conn: &Connection, deadline: &Deadline, user_id: i64) -> Result<Permissions> {
        let op = "get";
        let mut stmt = conn
            .prepare("SELECT code FROM users_permissions WHERE user_id = ?1 ORDER BY rowid")
            .map_err(sqlite_error(op, deadline))?;
        let codes = stmt
            .query_map([user_id], |row| row.get::<_, String>(0))
            .map_err(sqlite_error(op, deadline))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(sqlite_error(op, deadline))?;
        Ok(Permissions::new(codes))
    }

    fn find_user(
        conn: &Connection,
        deadline: &Deadline,
        clause: &str,
        args: &[SqlValue],
    ) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users {}", USER_COLUMNS, clause);
        conn.query_row(&sql, params_from_iter(args), user_from_row)
            .optional()
            .map_err(sqlite_error("get", deadline))
    }

    /// WHERE clause and arguments for a book listing
    fn book_conditions(query: &ListQuery) -> Result<(String, Vec<SqlValue>)> {
        let mut conditions = Vec::new();
        let mut args = Vec::new();

        for text in query.active_text() {
            // Only safelisted column names are ever interpolated
            if !BOOK_TEXT_FIELDS.contains(&text.field.as_str()) {
                return Err(LibrisError::Unsupported {
                    op: format!("text filter on {}", text.field),
                    collection: Collection::Books.name().to_string(),
                });
            }
            conditions.push(format!("{}({}, ?)", db::CONTAINS_CI, text.field));
            args.push(SqlValue::Text(text.value.clone()));
        }

        let tags: BTreeSet<&str> = query.tags.iter().map(String::as_str).collect();
        if !tags.is_empty() {
            conditions.push(
                "(SELECT COUNT(DISTINCT value) FROM json_each(books.genres) \
                 WHERE value IN (SELECT value FROM json_each(?))) = ?"
                    .to_string(),
            );
            args.push(SqlValue::Text(serde_json::to_string(&tags)?));
            args.push(SqlValue::Integer(tags.len() as i64));
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        Ok((clause, args))
    }
}

impl Storage for SqlStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn insert(&self, record: Record) -> Result<Record> {
        let op = "insert";
        let collection = record.collection();
        tracing::debug!(backend = "sqlite", collection = collection.name(), op);

        self.with_conn(op, |conn, deadline| match record {
            Record::Book(book) => Self::insert_book(conn, deadline, book),
            Record::User(user) => Self::insert_user(conn, deadline, user),
            Record::Token(token) => {
                conn.execute(
                    "INSERT INTO tokens (hash, scope, user_id, expiry) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        token.hash,
                        token.scope.as_str(),
                        token.user_id,
                        token.expiry.timestamp_millis(),
                    ],
                )
                .map_err(|e| {
                    if is_foreign_key_violation(&e) {
                        missing_user(token.user_id)
                    } else {
                        sqlite_error(op, deadline)(e)
                    }
                })?;
                Ok(Record::Token(token))
            }
            Record::Permissions(perms) => Self::insert_permissions(conn, deadline, perms),
        })
    }

    fn get(&self, collection: Collection, key: &Key) -> Result<Record> {
        let op = "get";
        tracing::debug!(backend = "sqlite", collection = collection.name(), op, %key);
        let not_found = || LibrisError::not_found(collection.name(), key.to_string());

        self.with_conn(op, |conn, deadline| match (collection, key) {
            (Collection::Books, Key::Id(id)) => {
                let sql = format!("SELECT {} FROM books WHERE id = ?1", BOOK_COLUMNS);
                conn.query_row(&sql, [id], book_from_row)
                    .optional()
                    .map_err(sqlite_error(op, deadline))?
                    .map(Record::Book)
                    .ok_or_else(not_found)
            }
            (Collection::Users, Key::Id(id)) => {
                Self::find_user(conn, deadline, "WHERE users.id = ?1", &[SqlValue::Integer(*id)])?
                    .map(Record::User)
                    .ok_or_else(not_found)
            }
            (Collection::Users, Key::Email(email)) => Self::find_user(
                conn,
                deadline,
                "WHERE users.email = ?1",
                &[SqlValue::Text(email.clone())],
            )?
            .map(Record::User)
            .ok_or_else(not_found),
            (Collection::Tokens, Key::Token { hash, scope }) => Self::find_user(
                conn,
                deadline,
                "INNER JOIN tokens ON users.id = tokens.user_id
                 WHERE tokens.hash = ?1 AND tokens.scope = ?2 AND tokens.expiry > ?3",
                &[
                    SqlValue::Blob(hash.clone()),
                    SqlValue::Text(scope.as_str().to_string()),
                    SqlValue::Integer(now_millis().timestamp_millis()),
                ],
            )?
            .map(Record::User)
            .ok_or_else(not_found),
            (Collection::Permissions, Key::UserId(user_id)) => {
                let codes = Self::permission_codes(conn, deadline, *user_id)?;
                Ok(Record::Permissions(UserPermissions {
                    user_id: *user_id,
                    codes,
                }))
            }
            (collection, _) => Err(Self::unsupported(op, collection)),
        })
    }

    fn get_all(&self, collection: Collection, query: &ListQuery) -> Result<Page> {
        let op = "get_all";
        if collection != Collection::Books {
            return Err(Self::unsupported(op, collection));
        }
        let plan = &query.plan;
        // Interpolated into ORDER BY below
        if !BOOK_SORT_SAFELIST.contains(&plan.sort_column()) {
            return Err(Self::unsupported(op, collection));
        }
        let (clause, args) = Self::book_conditions(query)?;

        let (total, books) = self.with_conn(op, |conn, deadline| {
            let count_sql = format!("SELECT COUNT(*) FROM books {}", clause);
            let total: i64 = conn
                .query_row(&count_sql, params_from_iter(&args), |row| row.get(0))
                .map_err(sqlite_error(op, deadline))?;
            if total == 0 {
                return Ok((0, Vec::new()));
            }

            let page_sql = format!(
                "SELECT {} FROM books {} ORDER BY {} {}, id ASC LIMIT ? OFFSET ?",
                BOOK_COLUMNS,
                clause,
                plan.sort_column(),
                plan.direction().as_sql()
            );
            let mut page_args = args.clone();
            page_args.push(SqlValue::Integer(plan.limit() as i64));
            page_args.push(SqlValue::Integer(plan.offset() as i64));

            let mut stmt = conn
                .prepare(&page_sql)
                .map_err(sqlite_error(op, deadline))?;
            let books = stmt
                .query_map(params_from_iter(&page_args), book_from_row)
                .map_err(sqlite_error(op, deadline))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(sqlite_error(op, deadline))?;
            Ok((total as u64, books))
        })?;
        tracing::debug!(backend = "sqlite", collection = collection.name(), op, total);

        if total == 0 {
            return Ok(Page::empty());
        }
        Ok(Page {
            records: books.into_iter().map(Record::Book).collect(),
            metadata: plan.metadata(total),
        })
    }

    fn update(&self, record: Record) -> Result<Record> {
        let op = "update";
        let collection = record.collection();
        tracing::debug!(backend = "sqlite", collection = collection.name(), op);

        self.with_conn(op, |conn, deadline| {
            let (id, changed, record) = match record {
                Record::Book(mut book) => {
                    let stale = book.version.to_string();
                    book.version = Uuid::new_v4();
                    let changed = conn
                        .execute(
                            "UPDATE books
                             SET title = ?1, author = ?2, year = ?3, size = ?4, genres = ?5,
                                 version = ?6
                             WHERE id = ?7 AND version = ?8",
                            params![
                                book.title,
                                book.author,
                                book.year,
                                book.size.pages(),
                                serde_json::to_string(&book.genres)?,
                                book.version.to_string(),
                                book.id,
                                stale,
                            ],
                        )
                        .map_err(sqlite_error(op, deadline))?;
                    (book.id, changed, Record::Book(book))
                }
                Record::User(mut user) => {
                    let stale = user.version.to_string();
                    user.version = Uuid::new_v4();
                    let hash = user.password.persisted_hash().to_vec();
                    let changed = conn
                        .execute(
                            "UPDATE users
                             SET name = ?1, email = ?2, password_hash = ?3, activated = ?4,
                                 version = ?5
                             WHERE id = ?6 AND version = ?7",
                            params![
                                user.name,
                                user.email,
                                hash,
                                user.activated,
                                user.version.to_string(),
                                user.id,
                                stale,
                            ],
                        )
                        .map_err(sqlite_error(op, deadline))?;
                    (user.id, changed, Record::User(user))
                }
                other => return Err(Self::unsupported(op, other.collection())),
            };

            if changed == 0 {
                return Err(LibrisError::EditConflict {
                    collection: collection.name().to_string(),
                    id,
                });
            }
            Ok(record)
        })
    }

    fn delete(&self, collection: Collection, key: &Key) -> Result<u64> {
        let op = "delete";
        tracing::debug!(backend = "sqlite", collection = collection.name(), op, %key);

        let removed = self.with_conn(op, |conn, deadline| {
            let removed = match (collection, key) {
                (Collection::Books, Key::Id(id)) => {
                    conn.execute("DELETE FROM books WHERE id = ?1", [id])
                }
                (Collection::Tokens, Key::UserScope { user_id, scope }) => conn.execute(
                    "DELETE FROM tokens WHERE user_id = ?1 AND scope = ?2",
                    params![user_id, scope.as_str()],
                ),
                (Collection::Permissions, Key::UserId(user_id)) => {
                    conn.execute("DELETE FROM users_permissions WHERE user_id = ?1", [user_id])
                }
                (collection, _) => return Err(Self::unsupported(op, collection)),
            };
            removed.map_err(sqlite_error(op, deadline))
        })?;

        if removed == 0 {
            return Err(LibrisError::not_found(collection.name(), key.to_string()));
        }
        Ok(removed as u64)
    }

    fn get_last_id(&self, collection: Collection) -> Result<i64> {
        let op = "get_last_id";
        if !matches!(collection, Collection::Books | Collection::Users) {
            return Err(Self::unsupported(op, collection));
        }
        let sql = format!("SELECT MAX(id) FROM {}", collection.name());

        let last: Option<i64> = self.with_conn(op, |conn, deadline| {
            conn.query_row(&sql, [], |row| row.get(0))
                .map_err(sqlite_error(op, deadline))
        })?;
        last.ok_or_else(|| LibrisError::not_found(collection.name(), "last id"))
    }
}
