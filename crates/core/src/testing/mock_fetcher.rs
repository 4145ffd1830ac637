//! Mock fetcher for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::artifact::Location;
use crate::services::{Fetcher, ServiceError};

/// Mock implementation of the Fetcher trait.
///
/// Inline locations return their bytes; any other location returns a small
/// PDF-looking payload unless a failure was registered for it.
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    calls: Arc<RwLock<Vec<Location>>>,
    failures: Arc<RwLock<Vec<(Location, ServiceError)>>>,
    latency: Arc<RwLock<Duration>>,
}

impl MockFetcher {
    /// Create a new mock fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every fetch of `location` fail with `error`.
    pub async fn fail_location(&self, location: Location, error: ServiceError) {
        self.failures.write().await.push((location, error));
    }

    /// Set the simulated retrieval latency.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = latency;
    }

    /// Locations fetched so far, in order.
    pub async fn recorded_calls(&self) -> Vec<Location> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, location: &Location) -> Result<Vec<u8>, ServiceError> {
        self.calls.write().await.push(location.clone());

        let latency = *self.latency.read().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if let Some((_, error)) = self
            .failures
            .read()
            .await
            .iter()
            .find(|(failing, _)| failing == location)
        {
            return Err(error.clone());
        }

        Ok(match location {
            Location::Inline(bytes) => bytes.clone(),
            other => format!("%PDF-mock {}", other.describe()).into_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registered_failure() {
        let fetcher = MockFetcher::new();
        let bad = Location::Url("http://x/404.pdf".into());
        fetcher
            .fail_location(bad.clone(), ServiceError::NotFound("404".into()))
            .await;

        assert!(fetcher.fetch(&bad).await.is_err());
        assert!(fetcher
            .fetch(&Location::Url("http://x/ok.pdf".into()))
            .await
            .is_ok());
        assert_eq!(fetcher.call_count().await, 2);
    }
}
