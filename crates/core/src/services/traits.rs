//! Trait definitions for the remote collaborators.

use async_trait::async_trait;

use crate::artifact::{ArtifactRef, Location, SourceDocument};
use crate::auth::Credential;
use crate::protection::PasswordPolicy;

use super::error::ServiceError;
use super::types::{DispatchReceipt, DispatchRequest};

/// Splits a combined document into per-recipient artifacts.
#[async_trait]
pub trait Splitter: Send + Sync {
    /// Returns the name of this implementation.
    fn name(&self) -> &str;

    async fn split(
        &self,
        source: &SourceDocument,
        credential: &Credential,
    ) -> Result<Vec<ArtifactRef>, ServiceError>;
}

/// Applies password protection to an artifact.
#[async_trait]
pub trait Protector: Send + Sync {
    /// Returns the name of this implementation.
    fn name(&self) -> &str;

    async fn protect(
        &self,
        source: &SourceDocument,
        policy: &PasswordPolicy,
        credential: &Credential,
    ) -> Result<Vec<ArtifactRef>, ServiceError>;
}

/// Sends one artifact to one recipient.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Returns the name of this implementation.
    fn name(&self) -> &str;

    async fn dispatch_one(
        &self,
        request: &DispatchRequest,
        credential: &Credential,
    ) -> Result<DispatchReceipt, ServiceError>;
}

/// Retrieves the bytes behind an artifact location.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, location: &Location) -> Result<Vec<u8>, ServiceError>;
}
