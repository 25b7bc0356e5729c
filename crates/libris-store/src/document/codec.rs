//! Document codecs
//!
//! Explicit stored shapes for each entity. Timestamps are epoch milliseconds
//! and binary hashes are lowercase hex, so every field stays comparable with
//! the engine's native predicates.

use libris_core::clock::from_millis;
use libris_core::core_types::Sensitive;
use libris_core::errors::{LibrisError, Result};
use libris_core::model::{
    Book, Password, Permissions, Size, Token, TokenScope, User, UserPermissions,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::engine::Document;

// Stored field names shared with the adapter's filters
pub const ID: &str = "id";
pub const CREATED_AT: &str = "created_at";
pub const VERSION: &str = "version";
pub const EMAIL: &str = "email";
pub const GENRES: &str = "genres";
pub const HASH: &str = "hash";
pub const SCOPE: &str = "scope";
pub const USER_ID: &str = "user_id";
pub const EXPIRY: &str = "expiry";
pub const CODES: &str = "codes";

#[derive(Serialize, Deserialize)]
struct BookDoc {
    id: i64,
    created_at: i64,
    title: String,
    author: String,
    year: i32,
    size: i32,
    genres: Vec<String>,
    version: Uuid,
}

#[derive(Serialize, Deserialize)]
struct UserDoc {
    id: i64,
    created_at: i64,
    name: String,
    email: String,
    password_hash: String,
    activated: bool,
    version: Uuid,
}

#[derive(Serialize, Deserialize)]
struct TokenDoc {
    hash: String,
    scope: TokenScope,
    user_id: i64,
    expiry: i64,
}

#[derive(Serialize, Deserialize)]
struct PermissionsDoc {
    user_id: i64,
    codes: Vec<String>,
}

fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(LibrisError::Serialization {
            message: format!("expected a JSON object, got {}", other),
        }),
    }
}

fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value).map_err(|e| LibrisError::Serialization {
        message: format!("{} is not valid hex: {}", field, e),
    })
}

pub fn encode_book(book: &Book) -> Result<Document> {
    to_document(&BookDoc {
        id: book.id,
        created_at: book.created_at.timestamp_millis(),
        title: book.title.clone(),
        author: book.author.clone(),
        year: book.year,
        size: book.size.pages(),
        genres: book.genres.clone(),
        version: book.version,
    })
}

pub fn decode_book(doc: Document) -> Result<Book> {
    let d: BookDoc = from_document(doc)?;
    Ok(Book {
        id: d.id,
        created_at: from_millis(d.created_at),
        title: d.title,
        author: d.author,
        year: d.year,
        size: Size(d.size),
        genres: d.genres,
        version: d.version,
    })
}

/// # Panics
/// Panics if the user has no password hash.
pub fn encode_user(user: &User) -> Result<Document> {
    to_document(&UserDoc {
        id: user.id,
        created_at: user.created_at.timestamp_millis(),
        name: user.name.clone(),
        email: user.email.clone(),
        password_hash: hex::encode(user.password.persisted_hash()),
        activated: user.activated,
        version: user.version,
    })
}

pub fn decode_user(doc: Document) -> Result<User> {
    let d: UserDoc = from_document(doc)?;
    Ok(User {
        id: d.id,
        created_at: from_millis(d.created_at),
        name: d.name,
        email: d.email,
        password: Password::from_hash(decode_hex("password_hash", &d.password_hash)?),
        activated: d.activated,
        version: d.version,
    })
}

/// Stored form of a token hash
pub fn token_hash(hash: &[u8]) -> String {
    hex::encode(hash)
}

pub fn encode_token(token: &Token) -> Result<Document> {
    to_document(&TokenDoc {
        hash: token_hash(&token.hash),
        scope: token.scope,
        user_id: token.user_id,
        expiry: token.expiry.timestamp_millis(),
    })
}

pub fn decode_token(doc: Document) -> Result<Token> {
    let d: TokenDoc = from_document(doc)?;
    Ok(Token {
        plaintext: Sensitive::new(String::new()),
        hash: decode_hex("hash", &d.hash)?,
        user_id: d.user_id,
        expiry: from_millis(d.expiry),
        scope: d.scope,
    })
}

pub fn encode_permissions(perms: &UserPermissions) -> Result<Document> {
    to_document(&PermissionsDoc {
        user_id: perms.user_id,
        codes: perms.codes.codes().to_vec(),
    })
}

pub fn decode_permissions(doc: Document) -> Result<UserPermissions> {
    let d: PermissionsDoc = from_document(doc)?;
    Ok(UserPermissions {
        user_id: d.user_id,
        codes: Permissions::new(d.codes),
    })
}
