use std::fmt;

use serde::{Deserialize, Serialize};

/// Source of the bearer token attached to every backend request.
///
/// Token acquisition and refresh belong to the host application's session
/// layer; the booking core only reads whatever token is current and reacts
/// to `401` responses.
pub trait CredentialProvider: Send + Sync {
    fn access_token(&self) -> Option<String>;
}

/// Fixed token, for hosts that refresh by rebuilding the client and for tests.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self { token: None }
    }
}

impl CredentialProvider for StaticCredentials {
    fn access_token(&self) -> Option<String> {
        self.token.clone().filter(|token| !token.trim().is_empty())
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
