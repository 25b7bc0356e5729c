pub mod book;
pub mod permissions;
pub mod token;
pub mod user;

pub use book::{validate_book, Book, Size, BOOK_SORT_SAFELIST, BOOK_TEXT_FIELDS};
pub use permissions::{Permissions, UserPermissions, BOOKS_READ, BOOKS_WRITE};
pub use token::{validate_token_plaintext, Token, TokenScope};
pub use user::{
    validate_email, validate_password_plaintext, validate_user, Password, Principal, User,
};
