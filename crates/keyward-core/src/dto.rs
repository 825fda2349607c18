use crate::domain::{Credential, CredentialId};
use crate::rules::FieldError;
use serde::{Deserialize, Serialize};

/// Outward view of a credential. Carries no digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDto {
    pub id: CredentialId,
    pub name: String,
    pub email: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&Credential> for CredentialDto {
    fn from(credential: &Credential) -> Self {
        Self {
            id: credential.id,
            name: credential.name.clone(),
            email: credential.email.clone(),
            created_at: credential.created_at,
            updated_at: credential.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrorDto {
    pub field: String,
    pub message: String,
}

impl From<&FieldError> for FieldErrorDto {
    fn from(error: &FieldError) -> Self {
        Self {
            field: error.field.label().to_string(),
            message: error.to_string(),
        }
    }
}
