//! Distribution orchestrator.
//!
//! Holds the single distribution job and the artifact registries, and exposes
//! the console operations:
//! - **Send now**: dispatch a batch immediately
//! - **Schedule**: arm a batch for a future instant, cancellable until it fires
//! - **Split / protect**: call the remote services and replace the registries
//! - **Recover**: restore a scheduled job persisted before a restart

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::{DistributionOrchestrator, OrchestratorServices};
pub use types::{JobSnapshot, JobState, JobUpdate, OrchestratorError, ScheduledJob};
