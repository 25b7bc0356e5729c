#![allow(dead_code)]

use std::time::Duration;

use libris_core::model::{Book, Password, Size, User};
use libris_core::storage::Record;

pub const SHORT_TIMEOUT: Duration = Duration::from_millis(200);

pub fn book(title: &str, genres: &[&str]) -> Record {
    Record::Book(Book::new(
        title,
        "Test Author",
        2001,
        Size(250),
        genres.iter().map(|g| g.to_string()).collect(),
    ))
}

/// A user with a precomputed hash, so tests skip bcrypt
pub fn user(name: &str, email: &str) -> Record {
    let mut user = User::new(name, email);
    user.password = Password::from_hash(b"$2b$04$not-a-real-hash".to_vec());
    Record::User(user)
}
