use crate::domain::email::normalize_email;
use crate::domain::ids::CredentialId;
use crate::error::CoreError;
use crate::secret::{verify_secret, SecretDigest, SecretInput};
use serde::{Deserialize, Serialize};

/// A persisted credential. Holds the digest only; plaintext never lives here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: CredentialId,
    pub name: String,
    pub email: String,
    pub secret_digest: SecretDigest,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Credential {
    pub fn authenticate(&self, candidate: &str) -> Result<bool, CoreError> {
        verify_secret(&self.secret_digest, candidate)
    }
}

/// Raw input for a new credential, exactly as submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialDraft {
    pub name: String,
    pub email: String,
    pub secret: Option<SecretInput>,
}

impl CredentialDraft {
    pub fn new(name: impl Into<String>, email: impl Into<String>, secret: SecretInput) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            secret: Some(secret),
        }
    }

    /// Returns the draft with its email canonicalized.
    pub fn normalized(self) -> Self {
        Self {
            email: normalize_email(&self.email),
            ..self
        }
    }
}

/// Partial update. `None` leaves a field untouched; a secret is only validated and
/// hashed when one is supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialChange {
    pub name: Option<String>,
    pub email: Option<String>,
    pub secret: Option<SecretInput>,
}

impl CredentialChange {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.secret.is_none()
    }

    /// Overlays the change on the current record, yielding the draft to validate.
    pub fn apply_to(&self, current: &Credential) -> CredentialDraft {
        CredentialDraft {
            name: self.name.clone().unwrap_or_else(|| current.name.clone()),
            email: match self.email.as_deref() {
                Some(email) => normalize_email(email),
                None => current.email.clone(),
            },
            secret: self.secret.clone(),
        }
    }
}
