pub mod accept;
pub mod validation;

pub use accept::{accept_change, accept_new, AcceptError, AcceptedChange, AcceptedCredential};
pub use validation::{
    validate, Field, FieldError, FieldErrorKind, FieldErrorsExt, MAX_EMAIL_CHARS, MAX_NAME_CHARS,
    MAX_SECRET_BYTES, MIN_SECRET_CHARS,
};
