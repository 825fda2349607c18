use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(pub Uuid);

impl Default for CredentialId {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CredentialId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::CredentialId;
    use std::str::FromStr;

    #[test]
    fn credential_id_parses_its_display_form() {
        let id = CredentialId::new();
        let parsed = CredentialId::from_str(&id.to_string()).expect("parse id");
        assert_eq!(parsed, id);
    }

    #[test]
    fn credential_id_rejects_garbage() {
        assert!(CredentialId::from_str("not-a-uuid").is_err());
    }
}
