use crate::domain::CredentialDraft;
use crate::secret::SecretInput;
pub use crate::secret::MAX_SECRET_BYTES;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

pub const MAX_NAME_CHARS: usize = 50;
pub const MAX_EMAIL_CHARS: usize = 255;
pub const MIN_SECRET_CHARS: usize = 6;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i-u)\A[\w+\-.]+@[a-z\d\-]+(\.[a-z\d\-]+)*\.[a-z]+\z")
        .expect("email pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Email,
    Secret,
    SecretConfirmation,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Email => "Email",
            Field::Secret => "Password",
            Field::SecretConfirmation => "Password confirmation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldErrorKind {
    Required,
    TooLong { max: usize },
    TooShort { min: usize },
    InvalidFormat,
    Duplicate,
    ConfirmationMismatch,
}

/// A recoverable, user-facing problem with one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: Field,
    #[serde(flatten)]
    pub kind: FieldErrorKind,
}

impl FieldError {
    pub fn new(field: Field, kind: FieldErrorKind) -> Self {
        Self { field, kind }
    }

    pub fn duplicate_email() -> Self {
        Self::new(Field::Email, FieldErrorKind::Duplicate)
    }

    /// The message without the field label, e.g. "can't be blank".
    pub fn message(&self) -> String {
        let unit = match self.field {
            Field::Secret => "bytes",
            _ => "characters",
        };
        match self.kind {
            FieldErrorKind::Required => "can't be blank".to_string(),
            FieldErrorKind::TooLong { max } => format!("is too long (maximum is {max} {unit})"),
            FieldErrorKind::TooShort { min } => {
                format!("is too short (minimum is {min} characters)")
            }
            FieldErrorKind::InvalidFormat => "is invalid".to_string(),
            FieldErrorKind::Duplicate => "has already been taken".to_string(),
            FieldErrorKind::ConfirmationMismatch => {
                format!("doesn't match {}", Field::Secret.label())
            }
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field.label(), self.message())
    }
}

pub trait FieldErrorsExt {
    fn for_field(&self, field: Field) -> Vec<FieldErrorKind>;
    fn has(&self, field: Field, kind: FieldErrorKind) -> bool;
}

impl FieldErrorsExt for [FieldError] {
    fn for_field(&self, field: Field) -> Vec<FieldErrorKind> {
        self.iter()
            .filter(|error| error.field == field)
            .map(|error| error.kind)
            .collect()
    }

    fn has(&self, field: Field, kind: FieldErrorKind) -> bool {
        self.iter()
            .any(|error| error.field == field && error.kind == kind)
    }
}

/// Checks every rule against an already-normalized draft and returns all violations.
///
/// `email_taken` is asked whether another record already owns the (normalized) email;
/// it is only consulted when the email is present.
pub fn validate<F>(draft: &CredentialDraft, email_taken: F) -> Vec<FieldError>
where
    F: Fn(&str) -> bool,
{
    let mut errors = Vec::new();
    validate_name(&draft.name, &mut errors);
    validate_email(&draft.email, email_taken, &mut errors);
    if let Some(secret) = draft.secret.as_ref() {
        validate_secret(secret, &mut errors);
    }
    errors
}

fn validate_name(name: &str, errors: &mut Vec<FieldError>) {
    if is_blank(name) {
        errors.push(FieldError::new(Field::Name, FieldErrorKind::Required));
        return;
    }
    if name.chars().count() > MAX_NAME_CHARS {
        errors.push(FieldError::new(
            Field::Name,
            FieldErrorKind::TooLong {
                max: MAX_NAME_CHARS,
            },
        ));
    }
}

fn validate_email<F>(email: &str, email_taken: F, errors: &mut Vec<FieldError>)
where
    F: Fn(&str) -> bool,
{
    if is_blank(email) {
        errors.push(FieldError::new(Field::Email, FieldErrorKind::Required));
        return;
    }
    if email.chars().count() > MAX_EMAIL_CHARS {
        errors.push(FieldError::new(
            Field::Email,
            FieldErrorKind::TooLong {
                max: MAX_EMAIL_CHARS,
            },
        ));
    }
    if !EMAIL_PATTERN.is_match(email) {
        errors.push(FieldError::new(Field::Email, FieldErrorKind::InvalidFormat));
    }
    if email_taken(email) {
        errors.push(FieldError::duplicate_email());
    }
}

fn validate_secret(input: &SecretInput, errors: &mut Vec<FieldError>) {
    let secret = input.secret.as_str();
    if is_blank(secret) {
        errors.push(FieldError::new(Field::Secret, FieldErrorKind::Required));
    } else if secret.chars().count() < MIN_SECRET_CHARS {
        errors.push(FieldError::new(
            Field::Secret,
            FieldErrorKind::TooShort {
                min: MIN_SECRET_CHARS,
            },
        ));
    }
    if secret.len() > MAX_SECRET_BYTES {
        errors.push(FieldError::new(
            Field::Secret,
            FieldErrorKind::TooLong {
                max: MAX_SECRET_BYTES,
            },
        ));
    }
    if let Some(confirmation) = input.confirmation.as_deref() {
        if confirmation != secret {
            errors.push(FieldError::new(
                Field::SecretConfirmation,
                FieldErrorKind::ConfirmationMismatch,
            ));
        }
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
