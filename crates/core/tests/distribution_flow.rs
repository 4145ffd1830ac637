//! Cross-module flow: protect -> register -> dispatch, without the orchestrator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fiche_core::{
    protection::degraded_name,
    registry::PROTECTED_SLOT,
    testing::{fixtures, MockDispatcher, MockFetcher, MockProtector},
    ArtifactRegistry, DispatchConfig, DispatchPipeline, DistributionItem, MemorySlotStore,
    MessageTemplate, PasswordPolicy, ProtectionFallback, ProtectionRequest, ServiceError,
    SessionCredentials,
};

#[tokio::test]
async fn test_degraded_protection_is_still_dispatchable() {
    let credentials = Arc::new(SessionCredentials::with_token("token"));
    let protector = MockProtector::new();
    protector
        .set_next_error(ServiceError::Transport("connection refused".into()))
        .await;

    let fallback = ProtectionFallback::new(
        Arc::new(protector.clone()),
        credentials.clone(),
        Duration::from_secs(1),
    );
    let source = fixtures::combined_document();
    let result = fallback
        .protect(ProtectionRequest::new(
            source.clone(),
            PasswordPolicy::Fixed("s3cret".into()),
        ))
        .await
        .unwrap();
    assert!(result.degraded);
    assert_eq!(result.artifacts[0].id, degraded_name(&source.name));

    let registry = ArtifactRegistry::open(Arc::new(MemorySlotStore::new()), PROTECTED_SLOT);
    registry.put(result.artifacts).unwrap();

    let items: Vec<DistributionItem> = registry.get().into_iter().map(Into::into).collect();
    let fetcher = MockFetcher::new();
    let dispatcher = MockDispatcher::new();
    let pipeline = DispatchPipeline::new(
        DispatchConfig::default(),
        Arc::new(fetcher.clone()),
        Arc::new(dispatcher.clone()),
        credentials,
    );

    let outcome = pipeline
        .run(&items, &MessageTemplate::default(), None)
        .await
        .unwrap();
    assert_eq!(outcome.succeeded, 1);

    let requests = dispatcher.recorded_requests().await;
    assert_eq!(requests[0].bytes, source.bytes);
    assert_eq!(requests[0].item_id, "fiches-de-paie-protected.pdf");
}

#[tokio::test]
async fn test_pacing_between_items_only() {
    let credentials = Arc::new(SessionCredentials::with_token("token"));
    let dispatcher = MockDispatcher::new();
    let config = DispatchConfig {
        pacing_delay_ms: 100,
        ..Default::default()
    };
    let pipeline = DispatchPipeline::new(
        config,
        Arc::new(MockFetcher::new()),
        Arc::new(dispatcher.clone()),
        credentials,
    );

    let started = Instant::now();
    let outcome = pipeline
        .run(&fixtures::registered_items(3), &MessageTemplate::default(), None)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(outcome.total(), 3);
    // Two gaps for three items; no delay after the last one.
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_secs(1));
}
