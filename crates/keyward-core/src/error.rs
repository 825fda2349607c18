use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("malformed secret digest")]
    MalformedDigest,
    #[error("secret hashing failed: {0}")]
    Hash(String),
    #[error("invalid hash cost: {0}")]
    InvalidCost(u32),
    #[error("invalid hash cost mode: {0:?}")]
    InvalidCostMode(String),
    #[error("secret is {0} bytes; at most 71 can be hashed")]
    SecretTooLong(usize),
}
