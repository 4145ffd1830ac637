//! Mock protector for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::artifact::{ArtifactRef, Location, SourceDocument};
use crate::auth::Credential;
use crate::protection::PasswordPolicy;
use crate::services::{Protector, ServiceError};

/// A recorded protection call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedProtection {
    pub source_name: String,
    pub policy: PasswordPolicy,
}

/// Mock implementation of the Protector trait.
///
/// Without configured artifacts it answers with one protected artifact named
/// after the source.
#[derive(Debug, Clone, Default)]
pub struct MockProtector {
    calls: Arc<RwLock<Vec<RecordedProtection>>>,
    artifacts: Arc<RwLock<Option<Vec<ArtifactRef>>>>,
    next_error: Arc<RwLock<Option<ServiceError>>>,
    latency: Arc<RwLock<Duration>>,
}

impl MockProtector {
    /// Create a new mock protector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call with `artifacts`.
    pub async fn set_artifacts(&self, artifacts: Vec<ArtifactRef>) {
        *self.artifacts.write().await = Some(artifacts);
    }

    /// Configure the next call to fail with the given error.
    pub async fn set_next_error(&self, error: ServiceError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the simulated protection latency.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = latency;
    }

    pub async fn recorded_calls(&self) -> Vec<RecordedProtection> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }
}

#[async_trait]
impl Protector for MockProtector {
    fn name(&self) -> &str {
        "mock"
    }

    async fn protect(
        &self,
        source: &SourceDocument,
        policy: &PasswordPolicy,
        _credential: &Credential,
    ) -> Result<Vec<ArtifactRef>, ServiceError> {
        self.calls.write().await.push(RecordedProtection {
            source_name: source.name.clone(),
            policy: policy.clone(),
        });

        let latency = *self.latency.read().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        if let Some(artifacts) = self.artifacts.read().await.clone() {
            return Ok(artifacts);
        }

        Ok(vec![ArtifactRef::new(
            format!("secured-{}", source.name),
            Location::Url(format!("http://files.test/protected/{}", source.name)),
        )])
    }
}
