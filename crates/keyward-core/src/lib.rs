pub mod domain;
pub mod dto;
pub mod error;
pub mod rules;
pub mod secret;

pub use domain::*;
pub use dto::*;
pub use error::CoreError;
pub use rules::*;
pub use secret::{hash_secret, verify_secret, CostMode, HashCost, SecretDigest, SecretInput};
