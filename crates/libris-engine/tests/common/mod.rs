#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use libris_core::model::{Book, Size, User};
use libris_core::storage::Storage;
use libris_engine::Models;
use libris_store::{DocumentStore, SqlStore};

/// Cheap bcrypt cost so tests stay fast
pub const TEST_COST: u32 = 4;

pub const OP_TIMEOUT: Duration = Duration::from_secs(2);

/// One fresh instance of every backend
pub fn backends() -> Vec<(&'static str, Arc<dyn Storage>)> {
    vec![
        ("document", Arc::new(DocumentStore::new(OP_TIMEOUT))),
        (
            "sqlite",
            Arc::new(SqlStore::open_in_memory(OP_TIMEOUT).expect("in-memory sqlite")),
        ),
    ]
}

/// Run `check` once per backend with fresh models
pub fn for_each_backend(check: impl Fn(&str, Models)) {
    for (name, storage) in backends() {
        check(name, Models::new(storage));
    }
}

pub fn book(title: &str, author: &str, genres: &[&str]) -> Book {
    Book::new(
        title,
        author,
        1999,
        Size(320),
        genres.iter().map(|g| g.to_string()).collect(),
    )
}

pub fn user(name: &str, email: &str, password: &str) -> User {
    let mut user = User::new(name, email);
    user.password
        .set_with_cost(password, TEST_COST)
        .expect("hash password");
    user
}
