pub mod credential;
pub mod email;
pub mod ids;

pub use credential::{Credential, CredentialChange, CredentialDraft};
pub use email::normalize_email;
pub use ids::CredentialId;
