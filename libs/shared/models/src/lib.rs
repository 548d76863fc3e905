pub mod auth;
pub mod error;

pub use auth::{CredentialProvider, StaticCredentials};
pub use error::ApiError;
