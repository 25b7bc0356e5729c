//! Document-store adapter
//!
//! Implements the storage contract over the embedded document engine.

use std::path::Path;
use std::time::Duration;

use libris_core::clock::now_millis;
use libris_core::errors::{LibrisError, Result};
use libris_core::model::{Permissions, UserPermissions, BOOK_SORT_SAFELIST, BOOK_TEXT_FIELDS};
use libris_core::query::{ListQuery, SortDirection};
use libris_core::storage::{BackendKind, Collection, Deadline, Key, Page, Record, Storage};
use serde_json::Value;
use uuid::Uuid;

use super::codec::{self, CODES, CREATED_AT, EMAIL, EXPIRY, GENRES, HASH, ID, SCOPE, USER_ID, VERSION};
use super::engine::{CollectionSpec, DocumentEngine, Filter, FindOptions, UpdateOp};

const SPECS: &[CollectionSpec] = &[
    CollectionSpec {
        name: "books",
        unique: &[&[ID]],
    },
    CollectionSpec {
        name: "users",
        unique: &[&[ID], &[EMAIL]],
    },
    CollectionSpec {
        name: "tokens",
        unique: &[&[HASH, SCOPE]],
    },
    CollectionSpec {
        name: "users_permissions",
        unique: &[&[USER_ID]],
    },
];

/// Storage backed by the embedded document engine
#[derive(Debug)]
pub struct DocumentStore {
    engine: DocumentEngine,
    op_timeout: Duration,
}

impl DocumentStore {
    /// In-memory store; nothing outlives the process
    pub fn new(op_timeout: Duration) -> Self {
        Self {
            engine: DocumentEngine::new(SPECS),
            op_timeout,
        }
    }

    /// Store persisted under the directory `dir`, created if missing
    ///
    /// # Errors
    /// Returns `Persistence` if the directory or a collection file cannot be
    /// read.
    pub fn open<P: AsRef<Path>>(dir: P, op_timeout: Duration) -> Result<Self> {
        let engine = DocumentEngine::open(SPECS, dir.as_ref())?;
        tracing::debug!(backend = "document", dir = %dir.as_ref().display(), "collections loaded");
        Ok(Self { engine, op_timeout })
    }

    /// Underlying engine, for callers that need direct collection access
    pub fn engine(&self) -> &DocumentEngine {
        &self.engine
    }

    fn deadline(&self) -> Deadline {
        Deadline::after(self.op_timeout)
    }

    fn unsupported(op: &str, collection: Collection) -> LibrisError {
        LibrisError::Unsupported {
            op: op.to_string(),
            collection: collection.name().to_string(),
        }
    }

    fn require_user(&self, user_id: i64, op: &str, deadline: &Deadline) -> Result<()> {
        let users = self.engine.read(Collection::Users.name(), op, deadline)?;
        if users.count(&Filter::eq(ID, user_id)) == 0 {
            return Err(LibrisError::not_found(
                Collection::Users.name(),
                Key::Id(user_id).to_string(),
            ));
        }
        Ok(())
    }

    fn find_user(&self, filter: &Filter, op: &str, deadline: &Deadline) -> Result<Option<Record>> {
        let users = self.engine.read(Collection::Users.name(), op, deadline)?;
        users
            .find_one(filter)
            .map(|doc| codec::decode_user(doc).map(Record::User))
            .transpose()
    }

    fn book_filter(query: &ListQuery) -> Result<Filter> {
        let mut filters = Vec::new();
        for text in query.active_text() {
            if !BOOK_TEXT_FIELDS.contains(&text.field.as_str()) {
                return Err(LibrisError::Unsupported {
                    op: format!("text filter on {}", text.field),
                    collection: Collection::Books.name().to_string(),
                });
            }
            filters.push(Filter::contains_ci(&text.field, &text.value)?);
        }
        if !query.tags.is_empty() {
            filters.push(Filter::all(GENRES, query.tags.iter().cloned()));
        }
        Ok(Filter::and(filters))
    }
}

impl Storage for DocumentStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Document
    }

    fn insert(&self, record: Record) -> Result<Record> {
        let op = "insert";
        let deadline = self.deadline();
        let collection = record.collection();
        tracing::debug!(backend = "document", collection = collection.name(), op);

        match record {
            Record::Book(mut book) => {
                let mut books = self.engine.write(collection.name(), op, &deadline)?;
                book.id = books.next_sequence();
                book.created_at = now_millis();
                book.version = Uuid::new_v4();
                books.insert_one(codec::encode_book(&book)?)?;
                Ok(Record::Book(book))
            }
            Record::User(mut user) => {
                let mut users = self.engine.write(collection.name(), op, &deadline)?;
                user.id = users.next_sequence();
                user.created_at = now_millis();
                user.version = Uuid::new_v4();
                users.insert_one(codec::encode_user(&user)?)?;
                Ok(Record::User(user))
            }
            Record::Token(token) => {
                self.require_user(token.user_id, op, &deadline)?;
                let mut tokens = self.engine.write(collection.name(), op, &deadline)?;
                tokens.insert_one(codec::encode_token(&token)?)?;
                Ok(Record::Token(token))
            }
            Record::Permissions(perms) => {
                self.require_user(perms.user_id, op, &deadline)?;
                let mut coll = self.engine.write(collection.name(), op, &deadline)?;
                let filter = Filter::eq(USER_ID, perms.user_id);
                let seed = codec::encode_permissions(&UserPermissions {
                    user_id: perms.user_id,
                    codes: Permissions::default(),
                })?;
                let codes = perms
                    .codes
                    .into_codes()
                    .into_iter()
                    .map(Value::String)
                    .collect();
                coll.upsert_one(&filter, seed, &[UpdateOp::AddToSet(CODES.to_string(), codes)])?;

                let doc = coll.find_one(&filter).ok_or_else(|| {
                    LibrisError::not_found(collection.name(), Key::UserId(perms.user_id).to_string())
                })?;
                Ok(Record::Permissions(codec::decode_permissions(doc)?))
            }
        }
    }

    fn get(&self, collection: Collection, key: &Key) -> Result<Record> {
        let op = "get";
        let deadline = self.deadline();
        tracing::debug!(backend = "document", collection = collection.name(), op, %key);
        let not_found = || LibrisError::not_found(collection.name(), key.to_string());

        match (collection, key) {
            (Collection::Books, Key::Id(id)) => {
                let books = self.engine.read(collection.name(), op, &deadline)?;
                let doc = books.find_one(&Filter::eq(ID, *id)).ok_or_else(not_found)?;
                Ok(Record::Book(codec::decode_book(doc)?))
            }
            (Collection::Users, Key::Id(id)) => self
                .find_user(&Filter::eq(ID, *id), op, &deadline)?
                .ok_or_else(not_found),
            (Collection::Users, Key::Email(email)) => self
                .find_user(&Filter::eq(EMAIL, email.as_str()), op, &deadline)?
                .ok_or_else(not_found),
            (Collection::Tokens, Key::Token { hash, scope }) => {
                // Stage one: live token to owner id
                let user_id = {
                    let tokens = self.engine.read(collection.name(), op, &deadline)?;
                    let filter = Filter::and(vec![
                        Filter::eq(HASH, codec::token_hash(hash)),
                        Filter::eq(SCOPE, scope.as_str()),
                        Filter::gt(EXPIRY, now_millis().timestamp_millis()),
                    ]);
                    tokens
                        .find_one(&filter)
                        .and_then(|doc| doc.get(USER_ID).and_then(Value::as_i64))
                        .ok_or_else(not_found)?
                };
                // Stage two: owner id to user
                self.find_user(&Filter::eq(ID, user_id), op, &deadline)?
                    .ok_or_else(not_found)
            }
            (Collection::Permissions, Key::UserId(user_id)) => {
                let coll = self.engine.read(collection.name(), op, &deadline)?;
                match coll.find_one(&Filter::eq(USER_ID, *user_id)) {
                    Some(doc) => Ok(Record::Permissions(codec::decode_permissions(doc)?)),
                    None => Ok(Record::Permissions(UserPermissions {
                        user_id: *user_id,
                        codes: Permissions::default(),
                    })),
                }
            }
            (collection, _) => Err(Self::unsupported(op, collection)),
        }
    }

    fn get_all(&self, collection: Collection, query: &ListQuery) -> Result<Page> {
        let op = "get_all";
        if collection != Collection::Books {
            return Err(Self::unsupported(op, collection));
        }
        let plan = &query.plan;
        if !BOOK_SORT_SAFELIST.contains(&plan.sort_column()) {
            return Err(Self::unsupported(op, collection));
        }
        let filter = Self::book_filter(query)?;
        let deadline = self.deadline();

        let (total, docs) = {
            let books = self.engine.read(collection.name(), op, &deadline)?;
            let total = books.count(&filter);
            let opts = FindOptions {
                sort: vec![
                    (plan.sort_column().to_string(), plan.direction()),
                    (ID.to_string(), SortDirection::Ascending),
                ],
                skip: plan.offset(),
                limit: Some(plan.limit()),
            };
            (total, books.find(&filter, &opts))
        };
        tracing::debug!(backend = "document", collection = collection.name(), op, total);

        if total == 0 {
            return Ok(Page::empty());
        }
        let records = docs
            .into_iter()
            .map(|doc| codec::decode_book(doc).map(Record::Book))
            .collect::<Result<Vec<_>>>()?;
        Ok(Page {
            records,
            metadata: plan.metadata(total),
        })
    }

    fn update(&self, record: Record) -> Result<Record> {
        let op = "update";
        let deadline = self.deadline();
        let collection = record.collection();
        tracing::debug!(backend = "document", collection = collection.name(), op);

        let (id, stale_version) = match &record {
            Record::Book(book) => (book.id, book.version),
            Record::User(user) => (user.id, user.version),
            _ => return Err(Self::unsupported(op, collection)),
        };
        let filter = Filter::and(vec![
            Filter::eq(ID, id),
            Filter::eq(VERSION, stale_version.to_string()),
        ]);

        let mut coll = self.engine.write(collection.name(), op, &deadline)?;
        let (record, doc) = match record {
            Record::Book(mut book) => {
                book.version = Uuid::new_v4();
                let doc = codec::encode_book(&book)?;
                (Record::Book(book), doc)
            }
            Record::User(mut user) => {
                user.version = Uuid::new_v4();
                let doc = codec::encode_user(&user)?;
                (Record::User(user), doc)
            }
            _ => return Err(Self::unsupported(op, collection)),
        };

        let ops = UpdateOp::set_all(doc, &[ID, CREATED_AT]);
        if coll.update_one(&filter, &ops)? == 0 {
            return Err(LibrisError::EditConflict {
                collection: collection.name().to_string(),
                id,
            });
        }
        Ok(record)
    }

    fn delete(&self, collection: Collection, key: &Key) -> Result<u64> {
        let op = "delete";
        let deadline = self.deadline();
        tracing::debug!(backend = "document", collection = collection.name(), op, %key);

        let filter = match (collection, key) {
            (Collection::Books, Key::Id(id)) => Filter::eq(ID, *id),
            (Collection::Tokens, Key::UserScope { user_id, scope }) => Filter::and(vec![
                Filter::eq(USER_ID, *user_id),
                Filter::eq(SCOPE, scope.as_str()),
            ]),
            (Collection::Permissions, Key::UserId(user_id)) => Filter::eq(USER_ID, *user_id),
            (collection, _) => return Err(Self::unsupported(op, collection)),
        };

        let mut coll = self.engine.write(collection.name(), op, &deadline)?;
        let removed = if collection == Collection::Books {
            coll.delete_one(&filter)?
        } else {
            coll.delete_many(&filter)?
        };
        if removed == 0 {
            return Err(LibrisError::not_found(collection.name(), key.to_string()));
        }
        Ok(removed)
    }

    fn get_last_id(&self, collection: Collection) -> Result<i64> {
        let op = "get_last_id";
        if !matches!(collection, Collection::Books | Collection::Users) {
            return Err(Self::unsupported(op, collection));
        }
        let deadline = self.deadline();
        let coll = self.engine.read(collection.name(), op, &deadline)?;
        coll.max(ID)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| LibrisError::not_found(collection.name(), "last id"))
    }
}
