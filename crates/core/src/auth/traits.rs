use async_trait::async_trait;
use thiserror::Error;

use super::types::Credential;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
}

/// Supplies the bearer credential required by every remote call.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Current credential, or `NotAuthenticated` when no session is open.
    async fn current_credential(&self) -> Result<Credential, AuthError>;
}
