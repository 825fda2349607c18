//! Secret hashing and verification.
//!
//! Digests are bcrypt modular-crypt strings (`$2b$<cost>$<salt><hash>`). The salt is
//! drawn fresh on every call to [`hash_secret`] and travels inside the digest, so the
//! same secret never hashes to the same bytes twice. Comparison during verification is
//! done by the bcrypt primitive in constant time.
//!
//! bcrypt keys on at most 72 bytes including a trailing NUL, so secrets are capped at
//! [`MAX_SECRET_BYTES`] and never silently truncated.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;
pub const MAX_SECRET_BYTES: usize = 71;

/// Environment-selected hashing profile. Never derived from request input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CostMode {
    #[default]
    Production,
    FastTest,
}

impl CostMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostMode::Production => "production",
            CostMode::FastTest => "fast-test",
        }
    }

    pub fn cost(&self) -> HashCost {
        match self {
            CostMode::Production => HashCost(DEFAULT_COST),
            CostMode::FastTest => HashCost(MIN_COST),
        }
    }
}

impl fmt::Display for CostMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CostMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "production" => Ok(CostMode::Production),
            "fast-test" => Ok(CostMode::FastTest),
            other => Err(CoreError::InvalidCostMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost(u32);

impl HashCost {
    pub fn new(cost: u32) -> Result<Self, CoreError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(CoreError::InvalidCost(cost));
        }
        Ok(Self(cost))
    }

    pub fn fast_test() -> Self {
        CostMode::FastTest.cost()
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for HashCost {
    fn default() -> Self {
        CostMode::Production.cost()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretDigest(String);

impl SecretDigest {
    /// Wraps a digest read back from storage. Shape is checked at verification time.
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Cost factor encoded in the digest, if it is well formed enough to read.
    pub fn cost(&self) -> Option<u32> {
        self.0.split('$').nth(2)?.parse().ok()
    }
}

impl fmt::Debug for SecretDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretDigest(..)")
    }
}

/// A plaintext secret and its optional confirmation, held only while a credential is
/// being accepted.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretInput {
    pub secret: String,
    pub confirmation: Option<String>,
}

impl SecretInput {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            confirmation: None,
        }
    }

    pub fn confirmed(secret: impl Into<String>, confirmation: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            confirmation: Some(confirmation.into()),
        }
    }
}

impl fmt::Debug for SecretInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretInput")
            .field("secret", &"<redacted>")
            .field(
                "confirmation",
                &self.confirmation.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

pub fn hash_secret(secret: &str, cost: HashCost) -> Result<SecretDigest, CoreError> {
    if secret.len() > MAX_SECRET_BYTES {
        return Err(CoreError::SecretTooLong(secret.len()));
    }
    let digest = bcrypt::non_truncating_hash(secret, cost.get()).map_err(|err| match err {
        bcrypt::BcryptError::Truncation(_) => CoreError::SecretTooLong(secret.len()),
        other => CoreError::Hash(other.to_string()),
    })?;
    Ok(SecretDigest(digest))
}

/// Checks `candidate` against a stored digest.
///
/// `Ok(false)` means the secret is wrong, including candidates too long to have been
/// hashed. A digest the primitive cannot parse is an integration fault and comes back
/// as [`CoreError::MalformedDigest`].
pub fn verify_secret(digest: &SecretDigest, candidate: &str) -> Result<bool, CoreError> {
    if candidate.len() > MAX_SECRET_BYTES {
        return Ok(false);
    }
    match bcrypt::non_truncating_verify(candidate, digest.as_str()) {
        Ok(matched) => Ok(matched),
        Err(bcrypt::BcryptError::Truncation(_)) => Ok(false),
        Err(_) => Err(CoreError::MalformedDigest),
    }
}
