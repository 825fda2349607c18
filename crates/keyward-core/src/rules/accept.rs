use crate::domain::{Credential, CredentialChange, CredentialDraft};
use crate::error::CoreError;
use crate::rules::validation::{validate, Field, FieldError, FieldErrorKind};
use crate::secret::{hash_secret, HashCost, SecretDigest};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AcceptError {
    #[error("{} validation error(s)", .0.len())]
    Invalid(Vec<FieldError>),
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl AcceptError {
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            AcceptError::Invalid(errors) => errors,
            AcceptError::Core(_) => &[],
        }
    }
}

/// A new credential that passed validation, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedCredential {
    pub name: String,
    pub email: String,
    pub secret_digest: SecretDigest,
}

/// The fields an update will write. `secret_digest` is only set when a new secret was
/// supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedChange {
    pub name: String,
    pub email: String,
    pub secret_digest: Option<SecretDigest>,
}

impl AcceptedChange {
    pub fn email_changed(&self, current: &Credential) -> bool {
        self.email != current.email
    }
}

/// Normalizes, validates and hashes a draft for creation.
pub fn accept_new<F>(
    draft: CredentialDraft,
    email_taken: F,
    cost: HashCost,
) -> Result<AcceptedCredential, AcceptError>
where
    F: Fn(&str) -> bool,
{
    let draft = draft.normalized();
    let mut errors = validate(&draft, email_taken);
    let Some(secret) = draft.secret.as_ref() else {
        errors.push(FieldError::new(Field::Secret, FieldErrorKind::Required));
        return Err(AcceptError::Invalid(errors));
    };
    if !errors.is_empty() {
        return Err(AcceptError::Invalid(errors));
    }
    let secret_digest = hash_secret(&secret.secret, cost)?;
    Ok(AcceptedCredential {
        name: draft.name,
        email: draft.email,
        secret_digest,
    })
}

/// Validates a partial update against the current record.
///
/// The email is normalized only if the change touches it. Secret rules run, and the
/// secret is hashed, only when the change carries a new secret.
pub fn accept_change<F>(
    current: &Credential,
    change: &CredentialChange,
    email_taken: F,
    cost: HashCost,
) -> Result<AcceptedChange, AcceptError>
where
    F: Fn(&str) -> bool,
{
    let draft = change.apply_to(current);
    let errors = validate(&draft, |email| email != current.email && email_taken(email));
    if !errors.is_empty() {
        return Err(AcceptError::Invalid(errors));
    }
    let secret_digest = match draft.secret.as_ref() {
        Some(secret) => Some(hash_secret(&secret.secret, cost)?),
        None => None,
    };
    Ok(AcceptedChange {
        name: draft.name,
        email: draft.email,
        secret_digest,
    })
}
