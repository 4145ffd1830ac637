//! Dispatch pipeline implementation.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::artifact::{DistributionItem, Location, MessageTemplate};
use crate::auth::{Credential, CredentialProvider};
use crate::metrics;
use crate::services::{DispatchReceipt, DispatchRequest, Dispatcher, Fetcher, ServiceError};

use super::config::DispatchConfig;
use super::types::{DispatchError, DispatchOutcome, DispatchProgress, FailureReason, ItemFailure};

/// Where the bytes of a resolved item come from.
#[derive(Clone, Copy)]
enum ItemSource<'a> {
    Bytes(&'a [u8]),
    Location(&'a Location),
}

/// An item with its recipient address settled.
struct ResolvedItem<'a> {
    index: usize,
    id: &'a str,
    source: ItemSource<'a>,
    address: String,
}

/// Processes batches against the dispatch service, one item at a time.
pub struct DispatchPipeline {
    config: DispatchConfig,
    fetcher: Arc<dyn Fetcher>,
    dispatcher: Arc<dyn Dispatcher>,
    credentials: Arc<dyn CredentialProvider>,
}

impl DispatchPipeline {
    /// Creates a new dispatch pipeline.
    pub fn new(
        config: DispatchConfig,
        fetcher: Arc<dyn Fetcher>,
        dispatcher: Arc<dyn Dispatcher>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            config,
            fetcher,
            dispatcher,
            credentials,
        }
    }

    /// Runs a batch to completion.
    ///
    /// Progress updates are sent on `progress_tx` if given; a dropped receiver
    /// does not affect the batch. An empty batch returns immediately without
    /// contacting any service.
    pub async fn run(
        &self,
        items: &[DistributionItem],
        template: &MessageTemplate,
        progress_tx: Option<mpsc::Sender<DispatchProgress>>,
    ) -> Result<DispatchOutcome, DispatchError> {
        if items.is_empty() {
            debug!("Empty batch, nothing to dispatch");
            return Ok(DispatchOutcome::default());
        }

        let credential = self
            .credentials
            .current_credential()
            .await
            .map_err(|_| DispatchError::NotAuthenticated)?;

        let resolved = self.resolve(items);
        let total = resolved.len();
        let started_at = Instant::now();
        let mut outcome = DispatchOutcome::default();

        info!(
            "Dispatching {} item(s) via {}",
            total,
            self.dispatcher.name()
        );

        for (n, item) in resolved.iter().enumerate() {
            if n > 0 && self.config.pacing_delay_ms > 0 {
                tokio::time::sleep(self.config.pacing_delay()).await;
            }

            let delivered = match self.process_item(item, template, &credential).await {
                Ok(receipt) => {
                    debug!(
                        "Item {} ({}) delivered to {}",
                        item.index, item.id, receipt.reported_address
                    );
                    metrics::DISPATCH_ITEMS
                        .with_label_values(&["delivered"])
                        .inc();
                    outcome.succeeded += 1;
                    true
                }
                Err(reason) => {
                    warn!("Item {} ({}) failed: {}", item.index, item.id, reason);
                    metrics::DISPATCH_ITEMS
                        .with_label_values(&[reason.code()])
                        .inc();
                    outcome.failed.push(ItemFailure {
                        index: item.index,
                        item_id: item.id.to_string(),
                        reason,
                    });
                    false
                }
            };

            if let Some(ref tx) = progress_tx {
                let _ = tx
                    .send(DispatchProgress {
                        processed: n + 1,
                        total,
                        item_id: item.id.to_string(),
                        delivered,
                    })
                    .await;
            }
        }

        let label = if outcome.is_complete() {
            "completed"
        } else {
            "partially_failed"
        };
        metrics::DISPATCH_BATCH_DURATION
            .with_label_values(&[label])
            .observe(started_at.elapsed().as_secs_f64());

        info!(
            "Batch finished: {} delivered, {} failed in {:.1}s",
            outcome.succeeded,
            outcome.failed.len(),
            started_at.elapsed().as_secs_f64()
        );

        Ok(outcome)
    }

    /// Settle the source and recipient address of every item once.
    fn resolve<'a>(&self, items: &'a [DistributionItem]) -> Vec<ResolvedItem<'a>> {
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let address = item
                    .recipient_address()
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or(&self.config.default_recipient_address)
                    .to_string();

                let source = match item {
                    DistributionItem::Local { bytes, .. } => ItemSource::Bytes(bytes),
                    DistributionItem::Registered(artifact) => {
                        ItemSource::Location(&artifact.location)
                    }
                };

                ResolvedItem {
                    index,
                    id: item.id(),
                    source,
                    address,
                }
            })
            .collect()
    }

    async fn process_item(
        &self,
        item: &ResolvedItem<'_>,
        template: &MessageTemplate,
        credential: &Credential,
    ) -> Result<DispatchReceipt, FailureReason> {
        let bytes = match item.source {
            ItemSource::Bytes(bytes) => bytes.to_vec(),
            ItemSource::Location(location) => {
                debug!("Retrieving {} from {}", item.id, location.describe());
                self.bounded(self.fetcher.fetch(location))
                    .await
                    .map_err(|e| FailureReason::RetrievalFailed(e.to_string()))?
            }
        };

        let pdf_url = match item.source {
            ItemSource::Location(Location::Url(url)) => Some(url.clone()),
            _ => None,
        };

        let request = DispatchRequest {
            item_id: item.id.to_string(),
            bytes,
            pdf_url,
            recipient_address: item.address.clone(),
            template: template.clone(),
        };

        match self
            .bounded(self.dispatcher.dispatch_one(&request, credential))
            .await
        {
            Ok(receipt) if receipt.delivered => Ok(receipt),
            Ok(receipt) => Err(FailureReason::DispatchRejected(format!(
                "not delivered to {}",
                receipt.reported_address
            ))),
            Err(e) if e.is_transport() => Err(FailureReason::TransportFailure(e.to_string())),
            Err(ServiceError::Rejected { message, .. }) => {
                Err(FailureReason::DispatchRejected(message))
            }
            Err(e) => Err(FailureReason::DispatchRejected(e.to_string())),
        }
    }

    /// Apply the per-call time budget.
    async fn bounded<T, F>(&self, call: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        tokio::time::timeout(self.config.call_timeout(), call)
            .await
            .unwrap_or(Err(ServiceError::Timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactRef;
    use crate::auth::SessionCredentials;
    use crate::testing::{MockDispatcher, MockFetcher};
    use std::time::Duration;

    struct Harness {
        fetcher: Arc<MockFetcher>,
        dispatcher: Arc<MockDispatcher>,
        pipeline: DispatchPipeline,
    }

    fn harness_with(credentials: SessionCredentials) -> Harness {
        let fetcher = Arc::new(MockFetcher::new());
        let dispatcher = Arc::new(MockDispatcher::new());
        let config = DispatchConfig {
            pacing_delay_ms: 0,
            call_timeout_secs: 1,
            default_recipient_address: "rh@example.com".to_string(),
        };
        let pipeline = DispatchPipeline::new(
            config,
            Arc::clone(&fetcher) as Arc<dyn Fetcher>,
            Arc::clone(&dispatcher) as Arc<dyn Dispatcher>,
            Arc::new(credentials),
        );
        Harness {
            fetcher,
            dispatcher,
            pipeline,
        }
    }

    fn harness() -> Harness {
        harness_with(SessionCredentials::with_token("token"))
    }

    fn registered(id: &str) -> DistributionItem {
        ArtifactRef::new(id, Location::Url(format!("http://files/{}.pdf", id))).into()
    }

    #[tokio::test]
    async fn test_empty_batch_contacts_nothing() {
        let h = harness_with(SessionCredentials::new());
        let outcome = h
            .pipeline
            .run(&[], &MessageTemplate::default(), None)
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::default());
        assert_eq!(h.dispatcher.call_count().await, 0);
        assert_eq!(h.fetcher.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_credential_aborts_before_first_item() {
        let h = harness_with(SessionCredentials::new());
        let result = h
            .pipeline
            .run(&[registered("EMP001")], &MessageTemplate::default(), None)
            .await;

        assert!(matches!(result, Err(DispatchError::NotAuthenticated)));
        assert_eq!(h.fetcher.call_count().await, 0);
        assert_eq!(h.dispatcher.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_items_dispatched_in_order() {
        let h = harness();
        let items = vec![
            registered("EMP001"),
            DistributionItem::local("EMP002", b"local".to_vec()),
            registered("EMP003"),
        ];

        let outcome = h
            .pipeline
            .run(&items, &MessageTemplate::default(), None)
            .await
            .unwrap();

        assert_eq!(outcome.succeeded, 3);
        let ids: Vec<_> = h
            .dispatcher
            .recorded_requests()
            .await
            .into_iter()
            .map(|r| r.item_id)
            .collect();
        assert_eq!(ids, vec!["EMP001", "EMP002", "EMP003"]);
        // local bytes never go through the fetcher
        assert_eq!(h.fetcher.call_count().await, 2);
    }

    #[tokio::test]
    async fn test_retrieval_failure_is_isolated() {
        let h = harness();
        h.fetcher
            .fail_location(
                Location::Url("http://files/EMP002.pdf".into()),
                ServiceError::NotFound("http://files/EMP002.pdf".into()),
            )
            .await;

        let items = vec![registered("EMP001"), registered("EMP002"), registered("EMP003")];
        let outcome = h
            .pipeline
            .run(&items, &MessageTemplate::default(), None)
            .await
            .unwrap();

        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].index, 1);
        assert_eq!(outcome.failed[0].item_id, "EMP002");
        assert_eq!(outcome.failed[0].reason.code(), "retrieval_failed");
        assert_eq!(h.dispatcher.call_count().await, 2);
    }

    #[tokio::test]
    async fn test_rejection_keeps_service_reason() {
        let h = harness();
        h.dispatcher
            .fail_item(
                "EMP001",
                ServiceError::Rejected {
                    status: 422,
                    message: "adresse invalide".into(),
                },
            )
            .await;

        let outcome = h
            .pipeline
            .run(&[registered("EMP001")], &MessageTemplate::default(), None)
            .await
            .unwrap();

        assert_eq!(
            outcome.failed[0].reason,
            FailureReason::DispatchRejected("adresse invalide".into())
        );
    }

    #[tokio::test]
    async fn test_transport_error_and_undelivered() {
        let h = harness();
        h.dispatcher
            .fail_item("EMP001", ServiceError::Transport("connection refused".into()))
            .await;
        h.dispatcher.undeliver_item("EMP002").await;

        let items = vec![registered("EMP001"), registered("EMP002"), registered("EMP003")];
        let outcome = h
            .pipeline
            .run(&items, &MessageTemplate::default(), None)
            .await
            .unwrap();

        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.failed[0].reason.code(), "transport_failure");
        assert_eq!(outcome.failed[1].reason.code(), "dispatch_rejected");
    }

    #[tokio::test]
    async fn test_slow_call_times_out_without_stopping_batch() {
        let h = harness();
        h.dispatcher
            .delay_item("EMP001", Duration::from_millis(1500))
            .await;

        let items = vec![registered("EMP001"), registered("EMP002")];
        let outcome = h
            .pipeline
            .run(&items, &MessageTemplate::default(), None)
            .await
            .unwrap();

        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.failed[0].item_id, "EMP001");
        assert_eq!(outcome.failed[0].reason.code(), "transport_failure");
    }

    #[tokio::test]
    async fn test_default_address_applied() {
        let h = harness();
        let items = vec![
            registered("EMP001"),
            ArtifactRef::new("EMP002", Location::Inline(vec![1]))
                .with_recipient_address("sophie.martin@example.com")
                .into(),
        ];

        h.pipeline
            .run(&items, &MessageTemplate::default(), None)
            .await
            .unwrap();

        let requests = h.dispatcher.recorded_requests().await;
        assert_eq!(requests[0].recipient_address, "rh@example.com");
        assert_eq!(requests[1].recipient_address, "sophie.martin@example.com");
    }

    #[tokio::test]
    async fn test_progress_once_per_item() {
        let h = harness();
        h.fetcher
            .fail_location(
                Location::Url("http://files/EMP002.pdf".into()),
                ServiceError::NotFound("gone".into()),
            )
            .await;
        let items = vec![registered("EMP001"), registered("EMP002"), registered("EMP003")];
        let (tx, mut rx) = mpsc::channel(items.len());

        h.pipeline
            .run(&items, &MessageTemplate::default(), Some(tx))
            .await
            .unwrap();

        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update);
        }

        assert_eq!(updates.len(), 3);
        assert!(updates.windows(2).all(|w| w[0].processed < w[1].processed));
        assert_eq!(updates[2].processed, updates[2].total);
        assert!(!updates[1].delivered);
    }

    #[tokio::test]
    async fn test_template_forwarded() {
        let h = harness();
        let template = MessageTemplate::new("Bulletin", "Ci-joint.");

        h.pipeline
            .run(&[registered("EMP001")], &template, None)
            .await
            .unwrap();

        let requests = h.dispatcher.recorded_requests().await;
        assert_eq!(requests[0].template, template);
    }

    #[tokio::test]
    async fn test_url_artifacts_carry_download_link() {
        let h = harness();
        let items = vec![
            registered("EMP001"),
            DistributionItem::local("EMP002", vec![1, 2, 3]),
        ];

        h.pipeline
            .run(&items, &MessageTemplate::default(), None)
            .await
            .unwrap();

        let requests = h.dispatcher.recorded_requests().await;
        assert_eq!(
            requests[0].pdf_url.as_deref(),
            Some("http://files/EMP001.pdf")
        );
        assert!(requests[1].pdf_url.is_none());
        assert_eq!(requests[1].bytes, vec![1, 2, 3]);
    }
}
