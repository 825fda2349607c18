pub mod credentials;

pub use credentials::CredentialsRepo;
