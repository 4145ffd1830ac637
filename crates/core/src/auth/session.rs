use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use super::{AuthError, Credential, CredentialProvider};

/// Process-scoped session holding the credential issued at login.
#[derive(Debug, Default)]
pub struct SessionCredentials {
    current: RwLock<Option<Credential>>,
}

impl SessionCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session already opened with a token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            current: RwLock::new(Some(Credential::new(token))),
        }
    }

    /// Replace the session credential. An empty token is rejected.
    pub async fn login(&self, token: impl Into<String>) -> Result<(), AuthError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(AuthError::InvalidCredentials("empty token".to_string()));
        }
        *self.current.write().await = Some(Credential::new(token));
        info!("Session opened");
        Ok(())
    }

    pub async fn logout(&self) {
        if self.current.write().await.take().is_some() {
            info!("Session closed");
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }
}

#[async_trait]
impl CredentialProvider for SessionCredentials {
    async fn current_credential(&self) -> Result<Credential, AuthError> {
        self.current
            .read()
            .await
            .clone()
            .ok_or(AuthError::NotAuthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_session_is_unauthenticated() {
        let session = SessionCredentials::new();
        let result = session.current_credential().await;
        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_login_then_logout() {
        let session = SessionCredentials::new();
        session.login("token-1").await.unwrap();
        assert_eq!(session.current_credential().await.unwrap().token(), "token-1");

        session.login("token-2").await.unwrap();
        assert_eq!(session.current_credential().await.unwrap().token(), "token-2");

        session.logout().await;
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_login_rejects_blank_token() {
        let session = SessionCredentials::new();
        let result = session.login("   ").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
        assert!(!session.is_authenticated().await);
    }
}
