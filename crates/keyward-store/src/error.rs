use keyward_core::rules::{AcceptError, FieldError};
use keyward_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite error: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("invalid id string: {0}")]
    InvalidId(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("migration error: {0}")]
    Migration(String),
    #[error("validation failed: {}", join_messages(.0))]
    Validation(Vec<FieldError>),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<AcceptError> for StoreError {
    fn from(err: AcceptError) -> Self {
        match err {
            AcceptError::Invalid(errors) => StoreError::Validation(errors),
            AcceptError::Core(err) => StoreError::Core(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    Io,
    Sql,
    Core,
    InvalidId,
    NotFound,
    Migration,
    Validation,
}

impl StoreError {
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            StoreError::Io(_) => StoreErrorKind::Io,
            StoreError::Sql(_) => StoreErrorKind::Sql,
            StoreError::Core(_) => StoreErrorKind::Core,
            StoreError::InvalidId(_) => StoreErrorKind::InvalidId,
            StoreError::NotFound(_) => StoreErrorKind::NotFound,
            StoreError::Migration(_) => StoreErrorKind::Migration,
            StoreError::Validation(_) => StoreErrorKind::Validation,
        }
    }

    /// User-facing field errors, empty for every other kind.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            StoreError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
