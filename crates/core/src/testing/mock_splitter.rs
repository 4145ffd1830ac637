//! Mock splitter for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::artifact::{ArtifactRef, SourceDocument};
use crate::auth::Credential;
use crate::services::{ServiceError, Splitter};

/// Mock implementation of the Splitter trait.
#[derive(Debug, Clone, Default)]
pub struct MockSplitter {
    calls: Arc<RwLock<Vec<String>>>,
    artifacts: Arc<RwLock<Vec<ArtifactRef>>>,
    next_error: Arc<RwLock<Option<ServiceError>>>,
}

impl MockSplitter {
    /// Create a new mock splitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Artifacts returned by every successful split.
    pub async fn set_artifacts(&self, artifacts: Vec<ArtifactRef>) {
        *self.artifacts.write().await = artifacts;
    }

    /// Configure the next call to fail with the given error.
    pub async fn set_next_error(&self, error: ServiceError) {
        *self.next_error.write().await = Some(error);
    }

    /// Names of the documents split so far.
    pub async fn recorded_calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl Splitter for MockSplitter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn split(
        &self,
        source: &SourceDocument,
        _credential: &Credential,
    ) -> Result<Vec<ArtifactRef>, ServiceError> {
        self.calls.write().await.push(source.name.clone());

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        Ok(self.artifacts.read().await.clone())
    }
}
