//! Artifacts produced by splitting/protection and the items dispatched from them.

mod types;

pub use types::{ArtifactRef, DistributionItem, Location, MessageTemplate, SourceDocument};
