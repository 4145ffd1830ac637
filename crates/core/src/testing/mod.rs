//! Testing utilities and mock implementations of the remote collaborators.
//!
//! Every mock records the calls it receives and lets a test inject failures
//! or latency, so batches can be exercised without a console backend.
//!
//! # Example
//!
//! ```rust,ignore
//! use fiche_core::testing::{MockDispatcher, MockFetcher};
//!
//! let fetcher = MockFetcher::new();
//! let dispatcher = MockDispatcher::new();
//!
//! fetcher.fail_location(location, ServiceError::NotFound("gone".into())).await;
//! dispatcher.undeliver_item("EMP003").await;
//!
//! // Build a DispatchPipeline with them, run, then assert on
//! // dispatcher.recorded_requests().await
//! ```

mod mock_dispatcher;
mod mock_fetcher;
mod mock_protector;
mod mock_splitter;

pub use mock_dispatcher::MockDispatcher;
pub use mock_fetcher::MockFetcher;
pub use mock_protector::{MockProtector, RecordedProtection};
pub use mock_splitter::MockSplitter;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::artifact::{ArtifactRef, DistributionItem, Location, SourceDocument};

    /// Recipients used across tests.
    pub const MATRICULES: [&str; 5] = ["EMP001", "EMP002", "EMP003", "EMP004", "EMP005"];

    /// Artifact stored at a predictable URL.
    pub fn url_artifact(id: &str) -> ArtifactRef {
        ArtifactRef::new(id, Location::Url(format!("http://files.test/{}.pdf", id)))
    }

    /// Registered items for the first `count` recipients.
    pub fn registered_items(count: usize) -> Vec<DistributionItem> {
        MATRICULES
            .iter()
            .take(count)
            .map(|id| url_artifact(id).into())
            .collect()
    }

    /// A small combined source document.
    pub fn combined_document() -> SourceDocument {
        SourceDocument::new("fiches-de-paie.pdf", b"%PDF-1.7 combined".to_vec())
    }
}
