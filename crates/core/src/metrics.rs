//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Dispatch pipeline (per-item results, batch durations)
//! - Protection fallback (remote vs degraded)
//! - Job lifecycle and scheduler events
//!
//! Metrics are process-wide statics; the embedding application exposes them by
//! calling [`register_metrics`] on its own registry, or by gathering [`REGISTRY`].

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

/// Default registry with every core metric registered.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    if let Err(e) = register_metrics(&registry) {
        tracing::error!("Failed to register metrics: {}", e);
    }
    registry
});

// =============================================================================
// Dispatch Pipeline
// =============================================================================

/// Items processed by the dispatch pipeline, by result.
pub static DISPATCH_ITEMS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fiche_dispatch_items_total", "Total items processed"),
        &["result"], // "delivered", "retrieval_failed", "dispatch_rejected", "transport_failure"
    )
    .expect("valid metric definition")
});

/// Batch duration in seconds, by outcome.
pub static DISPATCH_BATCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "fiche_dispatch_batch_duration_seconds",
            "Duration of a dispatch batch",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0]),
        &["outcome"], // "completed", "partially_failed"
    )
    .expect("valid metric definition")
});

// =============================================================================
// Protection
// =============================================================================

/// Protection requests answered, by result.
pub static PROTECTION_RESULTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fiche_protection_results_total", "Total protection results"),
        &["result"], // "remote", "degraded"
    )
    .expect("valid metric definition")
});

// =============================================================================
// Jobs & Scheduler
// =============================================================================

/// Job state transitions.
pub static JOB_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fiche_job_transitions_total", "Total job state transitions"),
        &["from", "to"],
    )
    .expect("valid metric definition")
});

/// Scheduler events.
pub static SCHEDULER_EVENTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fiche_scheduler_events_total", "Total scheduler events"),
        &["event"], // "armed", "fired", "cancelled"
    )
    .expect("valid metric definition")
});

/// Register every core metric with `registry`.
pub fn register_metrics(registry: &Registry) -> Result<(), prometheus::Error> {
    registry.register(Box::new(DISPATCH_ITEMS.clone()))?;
    registry.register(Box::new(DISPATCH_BATCH_DURATION.clone()))?;
    registry.register(Box::new(PROTECTION_RESULTS.clone()))?;
    registry.register(Box::new(JOB_TRANSITIONS.clone()))?;
    registry.register(Box::new(SCHEDULER_EVENTS.clone()))?;
    Ok(())
}
