//! Mock dispatcher for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::auth::Credential;
use crate::services::{DispatchReceipt, DispatchRequest, Dispatcher, ServiceError};

/// Mock implementation of the Dispatcher trait.
///
/// Provides controllable behavior for testing:
/// - Record every dispatch attempt for assertions
/// - Fail specific items with a given error
/// - Report specific items as not delivered
/// - Delay specific items (to trigger call timeouts)
#[derive(Debug, Clone, Default)]
pub struct MockDispatcher {
    requests: Arc<RwLock<Vec<DispatchRequest>>>,
    failures: Arc<RwLock<HashMap<String, ServiceError>>>,
    undelivered: Arc<RwLock<HashSet<String>>>,
    delays: Arc<RwLock<HashMap<String, Duration>>>,
    latency: Arc<RwLock<Duration>>,
}

impl MockDispatcher {
    /// Create a new mock dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every attempt received, in order (failed ones included).
    pub async fn recorded_requests(&self) -> Vec<DispatchRequest> {
        self.requests.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Clear recorded requests.
    pub async fn clear_recorded_requests(&self) {
        self.requests.write().await.clear();
    }

    /// Make dispatches of `item_id` fail with `error`.
    pub async fn fail_item(&self, item_id: &str, error: ServiceError) {
        self.failures
            .write()
            .await
            .insert(item_id.to_string(), error);
    }

    /// Make dispatches of `item_id` answer `delivered = false`.
    pub async fn undeliver_item(&self, item_id: &str) {
        self.undelivered.write().await.insert(item_id.to_string());
    }

    /// Delay dispatches of `item_id`.
    pub async fn delay_item(&self, item_id: &str, delay: Duration) {
        self.delays.write().await.insert(item_id.to_string(), delay);
    }

    /// Set the simulated latency of every dispatch.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = latency;
    }
}

#[async_trait]
impl Dispatcher for MockDispatcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn dispatch_one(
        &self,
        request: &DispatchRequest,
        _credential: &Credential,
    ) -> Result<DispatchReceipt, ServiceError> {
        self.requests.write().await.push(request.clone());

        let delay = self
            .delays
            .read()
            .await
            .get(&request.item_id)
            .copied()
            .unwrap_or(*self.latency.read().await);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failures.read().await.get(&request.item_id) {
            return Err(error.clone());
        }

        Ok(DispatchReceipt {
            delivered: !self.undelivered.read().await.contains(&request.item_id),
            reported_address: request.recipient_address.clone(),
        })
    }
}
