pub mod validation;

pub use validation::{FieldError, Validator};
