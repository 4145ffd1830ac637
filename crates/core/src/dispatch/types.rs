//! Types for the dispatch module.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a single item could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The artifact bytes could not be retrieved from their location.
    RetrievalFailed(String),
    /// The dispatch service refused the message or did not deliver it.
    DispatchRejected(String),
    /// The dispatch service could not be reached in time.
    TransportFailure(String),
    /// The batch never started (e.g. the session expired before a scheduled run).
    PreconditionFailed(String),
}

impl FailureReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RetrievalFailed(_) => "retrieval_failed",
            Self::DispatchRejected(_) => "dispatch_rejected",
            Self::TransportFailure(_) => "transport_failure",
            Self::PreconditionFailed(_) => "precondition_failed",
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            Self::RetrievalFailed(d)
            | Self::DispatchRejected(d)
            | Self::TransportFailure(d)
            | Self::PreconditionFailed(d) => d,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.detail())
    }
}

/// A failed item of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// Position of the item in the batch (0-based).
    pub index: usize,
    pub item_id: String,
    pub reason: FailureReason,
}

/// Aggregate result of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub succeeded: usize,
    pub failed: Vec<ItemFailure>,
}

impl DispatchOutcome {
    /// Number of items accounted for.
    pub fn total(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    /// `true` when no item failed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Emitted once per item, after the item's work is finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchProgress {
    pub processed: usize,
    pub total: usize,
    pub item_id: String,
    pub delivered: bool,
}

impl DispatchProgress {
    /// Completion percentage (0-100).
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            return 100.0;
        }
        self.processed as f32 * 100.0 / self.total as f32
    }
}

/// Batch-level failures: nothing was attempted.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Authentication required before dispatching")]
    NotAuthenticated,
}
